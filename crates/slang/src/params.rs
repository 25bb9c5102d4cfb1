/// A tunable declared with `#pragma parameter`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub default: f32,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub step: Option<f32>,
}

/// Collects every `#pragma parameter <name> "<description>" <default> [min max step]`
/// line in declaration order.
///
/// A name declared twice keeps its first position but takes the values of
/// the later declaration. Lines without a name are ignored; a missing or
/// unparseable default reads as `0.0`.
pub fn parse_parameters(source: &str) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::new();
    for parameter in source.lines().filter_map(parse_line) {
        match parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => {
                tracing::debug!(name = %parameter.name, "parameter redeclared; using latest values");
                *existing = parameter;
            }
            None => parameters.push(parameter),
        }
    }
    parameters
}

fn parse_line(line: &str) -> Option<Parameter> {
    let rest = line.trim().strip_prefix("#pragma")?;
    let rest = rest.trim_start().strip_prefix("parameter")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() || name.starts_with('"') {
        return None;
    }

    let tail = &rest[name_end..];
    let (description, numbers) = match (tail.find('"'), tail.rfind('"')) {
        (Some(open), Some(close)) if close > open => (&tail[open + 1..close], &tail[close + 1..]),
        _ => ("", ""),
    };
    let mut numbers = numbers.split_whitespace().map(|v| v.parse::<f32>().ok());

    Some(Parameter {
        name: name.to_string(),
        description: description.to_string(),
        default: numbers.next().flatten().unwrap_or(0.0),
        min: numbers.next().flatten(),
        max: numbers.next().flatten(),
        step: numbers.next().flatten(),
    })
}
