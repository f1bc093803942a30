//! Generation options.

use fsmc_ir::ActionTree;
use fsmc_tables::Layout;

/// Host-language overrides for the registers the scan loop touches.
///
/// Each override is an action tree rendered in expression position and
/// wrapped in parentheses. `access` prefixes the persisted registers
/// (`cs`, `top`, `stack`, `act`, `ts`, `te`) and `data`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostExprs {
    pub access: Option<ActionTree>,
    pub p: Option<ActionTree>,
    pub pe: Option<ActionTree>,
    pub eof: Option<ActionTree>,
    pub cs: Option<ActionTree>,
    pub top: Option<ActionTree>,
    pub stack: Option<ActionTree>,
    pub act: Option<ActionTree>,
    pub ts: Option<ActionTree>,
    pub te: Option<ActionTree>,
    pub data: Option<ActionTree>,
    /// Expression yielding the current key.
    pub get_key: Option<ActionTree>,
    /// Statements run just before a call pushes the current state.
    pub pre_push: Option<ActionTree>,
    /// Statements run just after a return pops the call stack.
    pub post_pop: Option<ActionTree>,
}

/// Code generation options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenOptions {
    /// Machine name; prefixes every emitted constant.
    pub fsm_name: String,
    /// Emit constants without the machine-name prefix.
    pub no_prefix: bool,
    /// Emit `# line` directives before action bodies and guards.
    pub line_directives: bool,
    /// Force a table layout instead of choosing by cost.
    pub layout: Option<Layout>,
    pub host: HostExprs,
    /// The loop never tests for the end of the buffer.
    pub no_end: bool,
    /// `write_init` leaves `cs` alone.
    pub no_cs_init: bool,
    /// Omit the first-final constant.
    pub no_final: bool,
    /// Omit the error-state constant.
    pub no_error: bool,
    /// Omit entry-point constants.
    pub no_entry: bool,
    /// Array values per emitted line.
    pub items_per_line: usize,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            fsm_name: "fsm".to_string(),
            no_prefix: false,
            line_directives: true,
            layout: None,
            host: HostExprs::default(),
            no_end: false,
            no_cs_init: false,
            no_final: false,
            no_error: false,
            no_entry: false,
            items_per_line: 8,
        }
    }
}

impl GenOptions {
    pub fn new(fsm_name: impl Into<String>) -> Self {
        Self {
            fsm_name: fsm_name.into(),
            ..Default::default()
        }
    }

    /// Constant-name prefix, e.g. `SCANNER_`.
    #[must_use]
    pub fn prefix(&self) -> String {
        if self.no_prefix {
            String::new()
        } else {
            format!("{}_", self.fsm_name.to_uppercase())
        }
    }

    #[must_use]
    pub const fn with_no_prefix(mut self, enabled: bool) -> Self {
        self.no_prefix = enabled;
        self
    }

    #[must_use]
    pub const fn with_line_directives(mut self, enabled: bool) -> Self {
        self.line_directives = enabled;
        self
    }

    #[must_use]
    pub const fn with_layout(mut self, layout: Option<Layout>) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: HostExprs) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub const fn with_no_end(mut self, enabled: bool) -> Self {
        self.no_end = enabled;
        self
    }

    #[must_use]
    pub const fn with_items_per_line(mut self, n: usize) -> Self {
        self.items_per_line = if n == 0 { 1 } else { n };
        self
    }
}
