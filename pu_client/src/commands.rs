use pocket_uno::Color;
use std::fmt;

/// A line the player typed, parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Play the card at a hand index, naming a color for wilds.
    Play {
        card_index: usize,
        color: Option<Color>,
    },
    Draw,
    /// Press the UNO button.
    Uno,
    /// Host only: deal a match to the current lobby.
    Start,
    Help,
    Quit,
}

pub const HELP_TEXT: &str = "\
Available commands:
  play <index> [color]   Play a card from your hand (color required for wilds)
  draw                   Draw from the pile (takes any pending penalty)
  uno                    Call UNO, or catch someone who forgot
  start                  Deal a match (host only)
  help, quit";

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Play command missing the card index.
    PlayMissingCard,
    /// Card index is not a number.
    InvalidCardIndex(String),
    InvalidColor(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayMissingCard => {
                write!(f, "Play requires a card index (e.g., 'play 3' or 'play 5 red')")
            }
            Self::InvalidCardIndex(value) => write!(
                f,
                "Invalid card index '{}'. Must be a hand position (e.g., 'play 0')",
                value
            ),
            Self::InvalidColor(value) => write!(
                f,
                "Invalid color '{}'. Use red, blue, green, yellow (or orange, teal, purple, pink on the dark side)",
                value
            ),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a command string into a ClientCommand.
///
/// # Examples
///
/// ```
/// use pu_client::commands::{ClientCommand, parse_command};
/// use pocket_uno::Color;
///
/// assert_eq!(parse_command("draw"), Ok(ClientCommand::Draw));
/// assert_eq!(
///     parse_command("play 2 green"),
///     Ok(ClientCommand::Play { card_index: 2, color: Some(Color::Green) })
/// );
/// ```
pub fn parse_command(input: &str) -> Result<ClientCommand, ParseError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_ascii_lowercase();

    // Try single-word commands first
    match lowered.as_str() {
        "draw" | "d" => return Ok(ClientCommand::Draw),
        "uno" | "u" => return Ok(ClientCommand::Uno),
        "start" => return Ok(ClientCommand::Start),
        "help" | "?" => return Ok(ClientCommand::Help),
        "quit" | "exit" => return Ok(ClientCommand::Quit),
        _ => {}
    }

    // Parse multi-word commands
    let parts: Vec<&str> = lowered.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"play") | Some(&"p") => parse_play_command(&parts),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a play command: "play INDEX [COLOR]"
fn parse_play_command(parts: &[&str]) -> Result<ClientCommand, ParseError> {
    let value = parts.get(1).ok_or(ParseError::PlayMissingCard)?;
    let card_index = value
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidCardIndex(value.to_string()))?;
    let color = match parts.get(2) {
        Some(name) => match name.parse::<Color>() {
            Ok(Color::Wild) | Err(_) => return Err(ParseError::InvalidColor(name.to_string())),
            Ok(color) => Some(color),
        },
        None => None,
    };
    Ok(ClientCommand::Play { card_index, color })
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Single-word command tests ===

    #[test]
    fn test_parse_draw() {
        assert_eq!(parse_command("draw"), Ok(ClientCommand::Draw));
        assert_eq!(parse_command("d"), Ok(ClientCommand::Draw));
    }

    #[test]
    fn test_parse_uno() {
        assert_eq!(parse_command("UNO"), Ok(ClientCommand::Uno));
    }

    #[test]
    fn test_parse_start_help_quit() {
        assert_eq!(parse_command("start"), Ok(ClientCommand::Start));
        assert_eq!(parse_command("?"), Ok(ClientCommand::Help));
        assert_eq!(parse_command("exit"), Ok(ClientCommand::Quit));
    }

    // === Whitespace handling ===

    #[test]
    fn test_parse_with_surrounding_whitespace() {
        assert_eq!(parse_command("  draw  "), Ok(ClientCommand::Draw));
        assert_eq!(
            parse_command("  play   4  "),
            Ok(ClientCommand::Play {
                card_index: 4,
                color: None
            })
        );
    }

    // === Play command tests ===

    #[test]
    fn test_parse_play_with_color() {
        assert_eq!(
            parse_command("play 0 Yellow"),
            Ok(ClientCommand::Play {
                card_index: 0,
                color: Some(Color::Yellow)
            })
        );
        assert_eq!(
            parse_command("p 3 teal"),
            Ok(ClientCommand::Play {
                card_index: 3,
                color: Some(Color::Teal)
            })
        );
    }

    #[test]
    fn test_parse_play_without_index() {
        assert_eq!(parse_command("play"), Err(ParseError::PlayMissingCard));
    }

    #[test]
    fn test_parse_play_with_invalid_index() {
        assert!(matches!(
            parse_command("play -1"),
            Err(ParseError::InvalidCardIndex(_))
        ));
        assert!(matches!(
            parse_command("play two"),
            Err(ParseError::InvalidCardIndex(_))
        ));
    }

    #[test]
    fn test_parse_play_with_invalid_color() {
        assert_eq!(
            parse_command("play 1 wild"),
            Err(ParseError::InvalidColor("wild".to_string()))
        );
        assert!(matches!(
            parse_command("play 1 mauve"),
            Err(ParseError::InvalidColor(_))
        ));
    }

    // === Error cases ===

    #[test]
    fn test_parse_unrecognized_command() {
        assert!(matches!(
            parse_command("fold"),
            Err(ParseError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(matches!(
            parse_command("   "),
            Err(ParseError::UnrecognizedCommand(_))
        ));
    }

    // === Error message tests ===

    #[test]
    fn test_error_message_invalid_card_index() {
        let msg = ParseError::InvalidCardIndex("abc".to_string()).to_string();
        assert!(msg.contains("Invalid card index"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_error_message_unrecognized_command() {
        let msg = ParseError::UnrecognizedCommand("xyz".to_string()).to_string();
        assert!(msg.contains("Unrecognized command"));
        assert!(msg.contains("xyz"));
        assert!(msg.contains("help"));
    }
}
