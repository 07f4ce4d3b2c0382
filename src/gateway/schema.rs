use crate::interaction::{COMMAND_NAME, SERVER_OPTION, SubAction};
use serde_json::{Value, json};

const OPTION_SUB_COMMAND: u8 = 1;
const OPTION_STRING: u8 = 3;
const COMMAND_CHAT_INPUT: u8 = 1;

/// Registration payload for the `game-server` command group
pub fn game_server_command() -> Value {
    let sub_commands: Vec<Value> = SubAction::ALL
        .iter()
        .map(|action| {
            json!({
                "name": action.as_str(),
                "description": action.description(),
                "type": OPTION_SUB_COMMAND,
                "options": [{
                    "name": SERVER_OPTION,
                    "description": "Name of the game server",
                    "type": OPTION_STRING,
                    "required": true,
                    "autocomplete": true
                }]
            })
        })
        .collect();

    json!({
        "name": COMMAND_NAME,
        "description": "Manage game servers",
        "type": COMMAND_CHAT_INPUT,
        "options": sub_commands
    })
}
