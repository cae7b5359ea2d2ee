use rust_decimal::Decimal;
use std::str::FromStr;

/// One parsed chat command. The first token picks the command,
/// case-insensitively; anything unrecognized maps to [`Self::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Balance,
    Debts,
    Spent {
        amount: Decimal,
        description: Option<String>,
    },
    Received {
        amount: Decimal,
        description: Option<String>,
    },
    Unknown,
}

impl BotCommand {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let mut tokens = trimmed.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Self::Unknown;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "/start" | "start" => Self::Start,
            "/help" | "help" => Self::Help,
            "/balance" | "balance" => Self::Balance,
            "/debts" | "debts" => Self::Debts,
            "/spent" | "spent" => parse_amount_command(tokens, |amount, description| {
                Self::Spent {
                    amount,
                    description,
                }
            }),
            "/received" | "received" => parse_amount_command(tokens, |amount, description| {
                Self::Received {
                    amount,
                    description,
                }
            }),
            _ => Self::Unknown,
        }
    }
}

fn parse_amount_command<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    build: impl FnOnce(Decimal, Option<String>) -> BotCommand,
) -> BotCommand {
    let Some(raw) = tokens.next() else {
        return BotCommand::Unknown;
    };
    let Some(amount) = parse_amount(raw) else {
        return BotCommand::Unknown;
    };
    let rest = tokens.collect::<Vec<_>>().join(" ");
    let description = (!rest.is_empty()).then_some(rest);
    build(amount, description)
}

/// Parses a chat amount, accepting both `,` and `.` as the decimal
/// separator. Only positive amounts make sense in commands.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let normalized = raw.replace(',', ".");
    let amount = Decimal::from_str(&normalized).ok()?;
    (amount > Decimal::ZERO).then_some(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_start_and_help() {
        assert_eq!(BotCommand::parse("/start"), BotCommand::Start);
        assert_eq!(BotCommand::parse("  HELP  "), BotCommand::Help);
        assert_eq!(BotCommand::parse("/balance"), BotCommand::Balance);
        assert_eq!(BotCommand::parse("Debts"), BotCommand::Debts);
    }

    #[test]
    fn parses_spent_with_description() {
        assert_eq!(
            BotCommand::parse("spent 42.50 lunch with friends"),
            BotCommand::Spent {
                amount: dec!(42.50),
                description: Some("lunch with friends".to_string()),
            }
        );
    }

    #[test]
    fn parses_received_without_description() {
        assert_eq!(
            BotCommand::parse("/received 1000"),
            BotCommand::Received {
                amount: dec!(1000),
                description: None,
            }
        );
    }

    #[test]
    fn accepts_comma_decimal_separator() {
        assert_eq!(
            BotCommand::parse("spent 12,30 coffee"),
            BotCommand::Spent {
                amount: dec!(12.30),
                description: Some("coffee".to_string()),
            }
        );
    }

    #[test]
    fn rejects_bad_amounts() {
        assert_eq!(BotCommand::parse("spent"), BotCommand::Unknown);
        assert_eq!(BotCommand::parse("spent lunch"), BotCommand::Unknown);
        assert_eq!(BotCommand::parse("spent -5"), BotCommand::Unknown);
        assert_eq!(BotCommand::parse("spent 0"), BotCommand::Unknown);
    }

    #[test]
    fn unknown_text_maps_to_unknown() {
        assert_eq!(BotCommand::parse("what is my balance?"), BotCommand::Unknown);
        assert_eq!(BotCommand::parse(""), BotCommand::Unknown);
    }
}
