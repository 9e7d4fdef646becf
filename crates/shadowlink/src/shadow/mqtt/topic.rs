//! Shadow topic names.
//!
//! Layout: `$aws/things/{thing}/shadow/{operation}[/{reply}]`.

const PREFIX: &str = "$aws/things/";
const SHADOW: &str = "/shadow/";

/// Request operations this bridge publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Update,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Update => "update",
        }
    }
}

/// Inbound topics this bridge subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accepted(Operation),
    Rejected(Operation),
    Delta,
}

pub fn request_topic(thing: &str, operation: Operation) -> String {
    format!("{}{}{}{}", PREFIX, thing, SHADOW, operation.as_str())
}

/// Wildcard subscriptions covering every reply kind for every thing
pub fn reply_subscriptions() -> Vec<String> {
    ["get/accepted", "get/rejected", "update/accepted", "update/rejected", "update/delta"]
        .iter()
        .map(|suffix| format!("{}+{}{}", PREFIX, SHADOW, suffix))
        .collect()
}

/// Parse an inbound topic into the thing name and reply kind.
pub fn parse_reply_topic(topic: &str) -> Option<(String, Reply)> {
    let rest = topic.strip_prefix(PREFIX)?;
    let (thing, suffix) = rest.split_once(SHADOW)?;
    if thing.is_empty() || thing.contains('/') {
        return None;
    }

    let reply = match suffix {
        "get/accepted" => Reply::Accepted(Operation::Get),
        "get/rejected" => Reply::Rejected(Operation::Get),
        "update/accepted" => Reply::Accepted(Operation::Update),
        "update/rejected" => Reply::Rejected(Operation::Update),
        "update/delta" => Reply::Delta,
        _ => return None,
    };

    Some((thing.to_string(), reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_topic() {
        assert_eq!(
            request_topic("F1_KitchenLight", Operation::Update),
            "$aws/things/F1_KitchenLight/shadow/update"
        );
        assert_eq!(
            request_topic("Thermostat", Operation::Get),
            "$aws/things/Thermostat/shadow/get"
        );
    }

    #[test]
    fn test_parse_reply_topic() {
        assert_eq!(
            parse_reply_topic("$aws/things/Thermostat/shadow/update/delta"),
            Some(("Thermostat".to_string(), Reply::Delta))
        );
        assert_eq!(
            parse_reply_topic("$aws/things/F1_HallLight/shadow/get/rejected"),
            Some(("F1_HallLight".to_string(), Reply::Rejected(Operation::Get)))
        );
        assert_eq!(parse_reply_topic("$aws/things/Thermostat/shadow/update"), None);
        assert_eq!(parse_reply_topic("zigbee2mqtt/bridge/state"), None);
        assert_eq!(parse_reply_topic("$aws/things//shadow/update/delta"), None);
    }

    #[test]
    fn test_reply_subscriptions_cover_all_replies() {
        let subscriptions = reply_subscriptions();
        assert_eq!(subscriptions.len(), 5);
        assert!(subscriptions.contains(&"$aws/things/+/shadow/update/delta".to_string()));
    }
}
