use heat_core::{Classification, classify as classify_hit};

pub fn classify(hit: i32, format: &str) -> anyhow::Result<()> {
    let classification = classify_hit(hit);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        _ => {
            println!("{}", format_classification(hit, &classification));
        }
    }

    Ok(())
}

fn format_classification(hit: i32, classification: &Classification) -> String {
    let actions: Vec<&str> = classification.actions.iter().map(|a| a.label()).collect();
    let actions = if actions.is_empty() {
        "-".to_string()
    } else {
        actions.join(", ")
    };

    format!(
        "hit {hit:>3}  {state} [{severity}]\n  actions: {actions}\n  {message}",
        state = classification.state,
        severity = classification.severity,
        message = classification.state.alert_message(),
    )
}
