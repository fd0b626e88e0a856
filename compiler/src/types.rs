// types.rs — Type definitions printed once per output unit
//
// Several programs may be printed into the same output unit and share type
// definitions. The registry remembers every type name printed so far and
// grows monotonically.

use log::debug;

use crate::printer::Printer;
use crate::prog::Prog;

#[derive(Debug, Default, Clone)]
pub struct PrintedTypes {
    names: Vec<String>,
}

impl PrintedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_printed(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Print every type of `prog` not printed before, as `<definition>;`.
    pub fn print_types(&mut self, p: &mut Printer, prog: &Prog) {
        for ty in &prog.types {
            if self.already_printed(&ty.name) {
                continue;
            }
            debug!("printing type {}", ty.name);
            p.line(&format!("{};", ty.definition));
            self.names.push(ty.name.clone());
        }
    }
}
