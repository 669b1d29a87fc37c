// Remote settings editor: browse the bot's configuration groups and
// overwrite one key at a time.

use super::{confirm_typed, pause, pick, settle};
use crate::api::ApiClient;
use crate::render::{self, RULE_WIDTH};
use anyhow::Result;
use dialoguer::Input;
use serde_json::{Map, Value};

pub fn settings_menu(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "REMOTE SETTINGS");
    let Some(mut groups) =
        settle(render::with_spinner("Loading settings...", || api.settings_groups())).map(|s| s.config)
    else {
        return pause();
    };
    if groups.is_empty() {
        println!("The server reported no settings groups");
        return pause();
    }

    loop {
        render::screen(api.endpoint().base_url(), "REMOTE SETTINGS");
        let names: Vec<String> = groups.keys().cloned().collect();
        let Some(index) = pick("Settings group", &names)? else {
            return Ok(());
        };
        let group = &names[index];
        if let Some(values) = groups.get_mut(group) {
            edit_group(api, group, values)?;
        }
    }
}

fn edit_group(api: &ApiClient, group: &str, values: &mut Map<String, Value>) -> Result<()> {
    loop {
        render::screen(api.endpoint().base_url(), &format!("SETTINGS: {}", group));
        for (key, value) in values.iter() {
            println!("  {:<28} {}", key, render::scalar(Some(value)));
        }
        println!("{}", render::rule('-', RULE_WIDTH));

        let keys: Vec<String> = values.keys().cloned().collect();
        let Some(index) = pick("Setting to change", &keys)? else {
            return Ok(());
        };
        let key = &keys[index];
        let current = render::scalar(values.get(key));

        let input: String = Input::new()
            .with_prompt(format!("New value for {}", key))
            .with_initial_text(values.get(key).map(editable_text).unwrap_or_default())
            .allow_empty(true)
            .interact_text()?;
        let value = parse_setting_value(&input);

        println!("\n{}: {} -> {}", key, current, value);
        if !confirm_typed("UPDATE")? {
            println!("Update cancelled");
            pause()?;
            continue;
        }

        let mut patch = Map::new();
        patch.insert(key.clone(), value.clone());
        let outcome = render::with_spinner("Saving...", || api.update_settings(group, &patch));
        if let Some(notice) = settle(outcome) {
            values.insert(key.clone(), value);
            println!("Saved {}.{}", group, key);
            if let Some(message) = notice.message {
                println!("{}", message);
            }
        }
        pause()?;
    }
}

/// Operator text as a JSON value: numbers, booleans, null, arrays and
/// objects are taken literally, anything else is a string.
pub fn parse_setting_value(input: &str) -> Value {
    let input = input.trim();
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

/// Text to pre-fill for `value` such that accepting it unchanged yields the
/// same value. Strings stay bare unless they would read back as another type
/// (`"30"`, `"true"`), in which case they keep their quotes.
pub fn editable_text(value: &Value) -> String {
    match value {
        Value::String(s) if parse_setting_value(s) == *value => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_parse_as_json() {
        assert_eq!(parse_setting_value("30"), json!(30));
        assert_eq!(parse_setting_value(" 0.75 "), json!(0.75));
        assert_eq!(parse_setting_value("true"), json!(true));
        assert_eq!(parse_setting_value(r#"["EURUSD","XAUUSD"]"#), json!(["EURUSD", "XAUUSD"]));
        assert_eq!(parse_setting_value(r#""quoted""#), json!("quoted"));
    }

    #[test]
    fn bare_words_become_strings() {
        assert_eq!(parse_setting_value("EURUSD"), json!("EURUSD"));
        assert_eq!(parse_setting_value("London session"), json!("London session"));
        assert_eq!(parse_setting_value(""), json!(""));
    }

    #[test]
    fn unchanged_prefill_keeps_the_value_type() {
        for value in [
            json!("30"),
            json!("true"),
            json!("null"),
            json!(" padded "),
            json!("EURUSD"),
            json!(30),
            json!(0.75),
            json!(false),
            json!(["EURUSD", "XAUUSD"]),
            json!({"start": "08:00"}),
        ] {
            assert_eq!(parse_setting_value(&editable_text(&value)), value, "{}", value);
        }
        assert_eq!(editable_text(&json!("30")), r#""30""#);
        assert_eq!(editable_text(&json!("EURUSD")), "EURUSD");
    }
}
