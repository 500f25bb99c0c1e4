use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::host_tools::HostCommandResult;
use crate::wp_cli::ManagementTool;

#[derive(Debug, Default)]
pub(crate) struct ScriptedTool {
    responses: HashMap<String, HostCommandResult>,
    fallback: Option<HostCommandResult>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedTool {
    pub(crate) fn respond(mut self, args: &[&str], result: HostCommandResult) -> Self {
        self.responses.insert(args.join(" "), result);
        self
    }

    pub(crate) fn otherwise(mut self, result: HostCommandResult) -> Self {
        self.fallback = Some(result);
        self
    }

    pub(crate) fn was_called(&self, args: &[&str]) -> bool {
        self.calls.borrow().contains(&args.join(" "))
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ManagementTool for ScriptedTool {
    fn invoke(&self, _cwd: &Path, args: &[&str]) -> HostCommandResult {
        let key = args.join(" ");
        self.calls.borrow_mut().push(key.clone());
        self.responses
            .get(&key)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| HostCommandResult::completed(1, format!("Error: unscripted query `{key}`")))
    }
}
