//! Environment draft

use crate::error::{OverlayError, OverlayResult};
use crate::overlay::Draft;
use cds_model::{Environment, Variable};

/// Working copy of a repository-sourced environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDraft {
    env: Environment,
}

impl EnvironmentDraft {
    /// Change the environment name
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn rename(&mut self, name: &str) -> OverlayResult<()> {
        self.env.name = name.to_string();
        Ok(())
    }

    /// Append a variable
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn add_variable(&mut self, variable: Variable) -> OverlayResult<()> {
        self.env.variables.get_or_insert_with(Vec::new).push(variable);
        Ok(())
    }

    /// Replace the variable currently named `name`
    ///
    /// # Errors
    /// Returns [`OverlayError::UnknownName`] if no variable has that name
    pub fn update_variable(&mut self, name: &str, variable: Variable) -> OverlayResult<()> {
        let slot = self
            .env
            .variables
            .iter_mut()
            .flatten()
            .find(|v| v.name == name)
            .ok_or_else(|| OverlayError::unknown_name("variable", name))?;
        *slot = variable;
        Ok(())
    }

    /// Remove a variable by name
    ///
    /// # Errors
    /// Returns [`OverlayError::UnknownName`] if no variable has that name
    pub fn delete_variable(&mut self, name: &str) -> OverlayResult<()> {
        let vars = self.env.variables.get_or_insert_with(Vec::new);
        let before = vars.len();
        vars.retain(|v| v.name != name);
        if vars.len() == before {
            return Err(OverlayError::unknown_name("variable", name));
        }
        Ok(())
    }
}

impl Draft for EnvironmentDraft {
    type Canonical = Environment;

    fn derive(canonical: &Environment) -> Self {
        Self {
            env: canonical.clone(),
        }
    }

    fn materialize(&self) -> Environment {
        self.env.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_edits() {
        let mut draft = EnvironmentDraft::derive(&Environment::named("prod"));
        draft.add_variable(Variable::new("a", "1")).unwrap();
        draft.update_variable("a", Variable::new("b", "2")).unwrap();

        let env = draft.materialize();
        assert_eq!(env.variables.as_ref().unwrap()[0].name, "b");

        assert!(draft.update_variable("a", Variable::new("c", "3")).is_err());
        draft.delete_variable("b").unwrap();
        assert!(draft.materialize().variables.unwrap().is_empty());
    }
}
