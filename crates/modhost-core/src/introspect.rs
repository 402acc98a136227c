//! Generic view of what a loaded module can do
//!
//! Reads the module's static operation table; the base contract (`name`,
//! `version`) is never part of it.

use tracing::debug;

use modhost_abi::{InvokeError, OperationSpec, Value, ValueKind};

use crate::errors::HostError;
use crate::host::ModuleHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub kind: ValueKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    /// e.g. `add(int,int)`
    pub signature: String,
    pub name: String,
    pub return_kind: ValueKind,
    pub parameters: Vec<ParameterInfo>,
    /// False for event streams
    pub invokable: bool,
}

impl From<&OperationSpec> for OperationInfo {
    fn from(spec: &OperationSpec) -> Self {
        OperationInfo {
            signature: spec.signature(),
            name: spec.name.to_string(),
            return_kind: spec.returns,
            parameters: spec
                .params
                .iter()
                .map(|param| ParameterInfo {
                    kind: param.kind,
                    name: param.name.to_string(),
                })
                .collect(),
            invokable: spec.invokable,
        }
    }
}

impl ModuleHost {
    /// Operations of loaded module `name`; empty when it is not loaded.
    pub fn list_operations(&self, name: &str) -> Vec<OperationInfo> {
        self.registry()
            .module(name)
            .map(|module| module.operations().iter().map(OperationInfo::from).collect())
            .unwrap_or_default()
    }

    fn operation_spec(&self, name: &str, operation: &str) -> Result<OperationSpec, HostError> {
        let module = self
            .registry()
            .module(name)
            .ok_or_else(|| HostError::NotLoaded(name.to_string()))?;
        module
            .operations()
            .iter()
            .find(|spec| spec.name == operation)
            .copied()
            .ok_or_else(|| HostError::Invoke {
                module: name.to_string(),
                operation: operation.to_string(),
                source: InvokeError::UnknownOperation(operation.to_string()),
            })
    }

    /// Parse textual arguments according to the operation's parameter kinds.
    pub fn parse_arguments(
        &self,
        name: &str,
        operation: &str,
        raw: &[String],
    ) -> Result<Vec<Value>, HostError> {
        let spec = self.operation_spec(name, operation)?;
        let invoke_error = |source| HostError::Invoke {
            module: name.to_string(),
            operation: operation.to_string(),
            source,
        };

        if raw.len() != spec.params.len() {
            return Err(invoke_error(InvokeError::Arity {
                operation: operation.to_string(),
                expected: spec.params.len(),
                found: raw.len(),
            }));
        }
        spec.params
            .iter()
            .zip(raw)
            .map(|(param, text)| Value::parse(param.kind, text).map_err(invoke_error))
            .collect()
    }

    /// Call `operation` on loaded module `name` after checking the arguments.
    pub fn invoke(&self, name: &str, operation: &str, args: &[Value]) -> Result<Value, HostError> {
        let spec = self.operation_spec(name, operation)?;
        let invoke_error = |source| HostError::Invoke {
            module: name.to_string(),
            operation: operation.to_string(),
            source,
        };
        spec.check_arguments(args).map_err(invoke_error)?;

        let module = self
            .registry()
            .module(name)
            .ok_or_else(|| HostError::NotLoaded(name.to_string()))?;
        debug!(module = %name, operation = %operation, "Invoking");
        module
            .invoke(&self.context(), operation, args)
            .map_err(invoke_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{demo_host, write_module};
    use modhost_descriptor::ModuleDescriptor;
    use tempfile::TempDir;

    fn loaded_host(dir: &std::path::Path) -> Option<ModuleHost> {
        let mut host = demo_host(dir);
        for name in ["calculator", "greeter"] {
            let path = write_module(dir, name, &ModuleDescriptor::new(name));
            host.process_module(&path).ok()?;
            host.load_module(name).ok()?;
        }
        Some(host)
    }

    #[test]
    fn test_list_operations_matches_table() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(host) = loaded_host(dir.path()) else {
            return;
        };

        let greeter = host.list_operations("greeter");
        let signatures: Vec<&str> = greeter.iter().map(|op| op.signature.as_str()).collect();
        assert_eq!(
            signatures,
            vec![
                "greet(string)",
                "greet_with_sum(string,int,int)",
                "greet_later(string)",
                "greeted(string)"
            ]
        );
        assert!(greeter.iter().any(|op| op.name == "greeted" && !op.invokable));
        assert_eq!(
            greeter[1].parameters[1],
            ParameterInfo {
                kind: ValueKind::Int,
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_list_operations_empty_when_not_loaded() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let host = demo_host(dir.path());
        assert!(host.list_operations("calculator").is_empty());
    }

    #[test]
    fn test_invoke_checked() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(host) = loaded_host(dir.path()) else {
            return;
        };

        assert!(host
            .invoke("calculator", "add", &[Value::Int(4), Value::Int(5)])
            .is_ok_and(|v| v == Value::Int(9)));
        assert!(matches!(
            host.invoke("calculator", "add", &[Value::Int(4)]),
            Err(HostError::Invoke {
                source: InvokeError::Arity { .. },
                ..
            })
        ));
        assert!(matches!(
            host.invoke("calculator", "multiply", &[]),
            Err(HostError::Invoke {
                source: InvokeError::UnknownOperation(_),
                ..
            })
        ));
        assert!(matches!(
            host.invoke("greeter", "greeted", &[Value::from("x")]),
            Err(HostError::Invoke {
                source: InvokeError::NotInvokable(_),
                ..
            })
        ));
        assert!(matches!(
            host.invoke("chat", "send", &[]),
            Err(HostError::NotLoaded(_))
        ));
    }

    #[test]
    fn test_cross_module_invoke() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(host) = loaded_host(dir.path()) else {
            return;
        };

        let args = host.parse_arguments(
            "greeter",
            "greet_with_sum",
            &["Ada".to_string(), "2".to_string(), "3".to_string()],
        );
        let Ok(args) = args else {
            return;
        };
        let result = host.invoke("greeter", "greet_with_sum", &args);
        assert!(result.is_ok_and(|v| v == Value::from("Hello, Ada! 2 + 3 = 5")));
    }

    #[test]
    fn test_parse_arguments_errors() {
        let Ok(dir) = TempDir::new() else {
            return;
        };
        let Some(host) = loaded_host(dir.path()) else {
            return;
        };

        assert!(matches!(
            host.parse_arguments("calculator", "add", &["1".to_string(), "two".to_string()]),
            Err(HostError::Invoke {
                source: InvokeError::Parse { .. },
                ..
            })
        ));
        assert!(matches!(
            host.parse_arguments("calculator", "add", &["1".to_string()]),
            Err(HostError::Invoke {
                source: InvokeError::Arity { .. },
                ..
            })
        ));
    }
}
