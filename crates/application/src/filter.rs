//! Narrowing an application down to one scenario and an ordered set of objectives.

use crate::name::{clean_name, NameError};
use crate::types::Application;

/// Retains only the named scenario. An empty `scenario` is accepted when the
/// application has at most one scenario.
pub fn filter_scenarios(app: &mut Application, scenario: &str) -> Result<(), NameError> {
    let quoted = |app: &Application| app.scenarios.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join("', '");

    if scenario.is_empty() {
        if app.scenarios.len() > 1 {
            return Err(NameError::ScenarioRequired { names: quoted(app) });
        }
        return Ok(());
    }

    match app.scenarios.len() {
        0 => Err(NameError::UnknownScenario {
            scenario: scenario.to_string(),
            hint: "application has no scenarios defined".to_string(),
        }),
        1 if clean_name(&app.scenarios[0].name) == scenario => Ok(()),
        1 => Err(NameError::UnknownScenario {
            scenario: scenario.to_string(),
            hint: format!("must be '{}'", app.scenarios[0].name),
        }),
        _ => match app.scenarios.iter().position(|s| clean_name(&s.name) == scenario) {
            Some(i) => {
                let keep = app.scenarios.swap_remove(i);
                app.scenarios = vec![keep];
                Ok(())
            }
            None => Err(NameError::UnknownScenario {
                scenario: scenario.to_string(),
                hint: format!("should be one of '{}'", quoted(app)),
            }),
        },
    }
}

/// Retains and re-orders the objectives to match `objectives`. An empty list keeps
/// every objective.
pub fn filter_objectives<S: AsRef<str>>(app: &mut Application, objectives: &[S]) -> Result<(), NameError> {
    if objectives.is_empty() { return Ok(()); }

    let mut keep = Vec::with_capacity(objectives.len());
    let mut unknown = Vec::new();
    for name in objectives.iter().map(AsRef::as_ref) {
        match app.objectives.iter().find(|o| clean_name(&o.name) == name) {
            Some(o) => keep.push(o.clone()),
            None => unknown.push(name.to_string()),
        }
    }

    if !unknown.is_empty() {
        return Err(NameError::UnknownObjectives { names: unknown.join(", ") });
    }
    app.objectives = keep;
    Ok(())
}
