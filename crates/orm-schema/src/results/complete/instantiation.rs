//! Constructor (dynamic instantiation) results.

use super::{CompleteResultBuilder, ResultBuilder};
use crate::error::Result;
use crate::results::creation_state::DomainResultCreationState;
use crate::results::domain::DomainResult;
use crate::results::navigable_path::NavigablePath;

/// Builds `target` from the results of its argument builders, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompleteResultBuilderInstantiation {
    navigable_path: NavigablePath,
    target: String,
    argument_builders: Vec<CompleteResultBuilder>,
}

impl CompleteResultBuilderInstantiation {
    pub fn new(target: impl Into<String>, argument_builders: Vec<CompleteResultBuilder>) -> Self {
        let target = target.into();
        Self {
            navigable_path: NavigablePath::new(format!("new {}", target)),
            target,
            argument_builders,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn argument_builders(&self) -> &[CompleteResultBuilder] {
        &self.argument_builders
    }
}

impl ResultBuilder for CompleteResultBuilderInstantiation {
    fn navigable_path(&self) -> &NavigablePath {
        &self.navigable_path
    }

    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        let arguments = self
            .argument_builders
            .iter()
            .map(|builder| builder.build_result(state))
            .collect::<Result<Vec<_>>>()?;
        Ok(DomainResult::Instantiation {
            path: self.navigable_path.clone(),
            target: self.target.clone(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::results::complete::CompleteResultBuilderBasicValuedStandard;
    use crate::results::domain::DomainValue;
    use crate::results::jdbc_values::SimpleJdbcValuesMetadata;

    #[test]
    fn test_instantiation_collects_arguments_in_order() {
        let builder = CompleteResultBuilderInstantiation::new(
            "CustomerSummary",
            vec![
                CompleteResultBuilder::BasicValuedStandard(CompleteResultBuilderBasicValuedStandard::new(
                    Some("name".into()),
                    None,
                )),
                CompleteResultBuilder::BasicValuedStandard(CompleteResultBuilderBasicValuedStandard::new(
                    Some("total".into()),
                    None,
                )),
            ],
        );
        let metadata = SimpleJdbcValuesMetadata::new(["total", "name"]);
        let mut state = DomainResultCreationState::new(&metadata, false);
        let result = builder.build_result(&mut state).unwrap();
        assert_eq!(result.path().full_path(), "new CustomerSummary");

        let values = vec![SqlValue::Text("Ada".into()), SqlValue::Int(3)];
        assert_eq!(
            result.assemble(&values),
            DomainValue::Instantiation {
                target: "CustomerSummary".into(),
                arguments: vec![
                    DomainValue::Scalar(SqlValue::Text("Ada".into())),
                    DomainValue::Scalar(SqlValue::Int(3)),
                ],
            }
        );
    }
}
