// Terminal prompts and output formatting, built on `dialoguer`.

use anyhow::Result;
use dialoguer::{Confirm, Input, Password};

/// Ask for the operator's username and password. The password prompt
/// suppresses echo.
pub fn prompt_credentials() -> Result<(String, String)> {
    let username: String = Input::new()
        .with_prompt("Synapse admin username")
        .interact_text()?;
    let password: String = Password::new()
        .with_prompt("Synapse admin password")
        .interact()?;
    Ok((username.trim().to_string(), password))
}

/// Ask for the replacement password when resetting an account.
pub fn prompt_new_password(user_id: &str) -> Result<String> {
    let password: String = Password::new()
        .with_prompt(format!("New password for {user_id}"))
        .interact()?;
    Ok(password)
}

/// Ask which room to act on when it was not given on the command line.
pub fn prompt_room_id() -> Result<String> {
    let room: String = Input::new().with_prompt("Room to join").interact_text()?;
    Ok(room.trim().to_string())
}

/// Gate before the bulk deletion runs. Defaults to no.
pub fn confirm_sweep(count: usize) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!("Delete {count} rooms?"))
        .default(false)
        .interact()?)
}

/// Pretty-print a response body when it parses as JSON, pass it through
/// untouched otherwise.
pub fn render_json(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::render_json;

    #[test]
    fn render_json_indents_objects() {
        let out = render_json(r#"{"total":1,"users":[{"name":"@a:x"}]}"#);
        assert!(out.contains("\n"));
        assert!(out.contains("\"total\": 1"));
    }

    #[test]
    fn render_json_passes_non_json_through() {
        assert_eq!(render_json("plain text"), "plain text");
        assert_eq!(render_json(""), "");
    }
}
