//! Register expressions and constant names of the emitted code.

use fsmc_ir::{ActionTree, Loc, ReducedFsm};
use fsmc_tables::TableKind;

use crate::action::{ActionCompiler, ActionCtx};
use crate::error::Result;
use crate::options::GenOptions;

/// Resolved host expressions for every register the scan loop reads or
/// writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostNames {
    pub p: String,
    pub pe: String,
    pub eof: String,
    pub cs: String,
    pub top: String,
    pub stack: String,
    pub act: String,
    pub ts: String,
    pub te: String,
    pub data: String,
    pub get_key: String,
}

impl Default for HostNames {
    fn default() -> Self {
        Self {
            p: "p".to_string(),
            pe: "pe".to_string(),
            eof: "eof".to_string(),
            cs: "cs".to_string(),
            top: "top".to_string(),
            stack: "stack".to_string(),
            act: "act".to_string(),
            ts: "ts".to_string(),
            te: "te".to_string(),
            data: "data".to_string(),
            get_key: "data[p].ord".to_string(),
        }
    }
}

impl HostNames {
    /// Apply the overrides in `opts`. Override trees are rendered against
    /// the default names.
    pub fn resolve(fsm: &ReducedFsm, opts: &GenOptions) -> Result<Self> {
        let base = Self::default();
        let compiler = ActionCompiler::new(fsm, &base, opts);
        let host = &opts.host;
        let render = |tree: Option<&ActionTree>, default: String| -> Result<String> {
            match tree {
                Some(tree) => Ok(format!("({})", compiler.expr(tree, ActionCtx::default(), None)?)),
                None => Ok(default),
            }
        };

        let access = match &host.access {
            Some(tree) => compiler.expr(tree, ActionCtx::default(), None)?,
            None => String::new(),
        };
        let p = render(host.p.as_ref(), base.p.clone())?;
        let data = render(host.data.as_ref(), format!("{access}data"))?;
        let get_key = render(host.get_key.as_ref(), format!("{data}[{p}].ord"))?;

        Ok(Self {
            pe: render(host.pe.as_ref(), base.pe.clone())?,
            eof: render(host.eof.as_ref(), base.eof.clone())?,
            cs: render(host.cs.as_ref(), format!("{access}cs"))?,
            top: render(host.top.as_ref(), format!("{access}top"))?,
            stack: render(host.stack.as_ref(), format!("{access}stack"))?,
            act: render(host.act.as_ref(), format!("{access}act"))?,
            ts: render(host.ts.as_ref(), format!("{access}ts"))?,
            te: render(host.te.as_ref(), format!("{access}te"))?,
            p,
            data,
            get_key,
        })
    }
}

/// Names of the emitted constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstNames {
    prefix: String,
}

impl ConstNames {
    #[must_use]
    pub fn new(opts: &GenOptions) -> Self {
        Self {
            prefix: opts.prefix(),
        }
    }

    #[must_use]
    pub fn array(&self, kind: TableKind) -> String {
        self.named(kind.base_name())
    }

    #[must_use]
    pub fn named(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_uppercase())
    }

    #[must_use]
    pub fn start(&self) -> String {
        self.named("start")
    }

    #[must_use]
    pub fn first_final(&self) -> String {
        self.named("first_final")
    }

    #[must_use]
    pub fn error(&self) -> String {
        self.named("error")
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> String {
        self.named(&format!("en_{name}"))
    }

    #[must_use]
    pub fn export(&self, name: &str) -> String {
        self.named(&format!("ex_{name}"))
    }
}

/// `# line N "file"`, with backslashes in the file name doubled.
#[must_use]
pub fn line_directive(loc: &Loc) -> String {
    format!("# line {} \"{}\"", loc.line, loc.file.replace('\\', "\\\\"))
}
