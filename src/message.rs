//! The message protocol between progress producers and the consumer.
//!
//! A closed set of tagged commands. The consumer dispatches on the tag with
//! an exhaustive match, so an unrecognized message is unrepresentable.
//! Messages are plain data (serde-derived) and carry no live references,
//! which keeps them transmissible across any worker boundary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered key→value annotation rendered after the bar.
///
/// Insertion order is preserved, so `{"loss": .., "acc": ..}` renders in
/// exactly that order.
pub type Postfix = IndexMap<String, String>;

/// A command sent from a producer to the render consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressMessage {
    /// Advance the completed count by a delta.
    Update(u64),
    /// Replace the total unit count.
    SetTotal(u64),
    /// Increment the total unit count.
    AddTotal(u64),
    /// Replace the postfix annotation wholesale (never merged).
    SetPostfix(Postfix),
    /// Emit a line above the bar without disturbing the bar row.
    Write(String),
    /// Terminal signal: the consumer closes the bar and exits its loop.
    ///
    /// Exactly one Stop is sent per session, by the session itself on
    /// close. Anything enqueued after it is dropped unread.
    Stop,
}

/// Build a [`Postfix`] from literal key/value pairs.
///
/// Values are stringified with `Display`.
///
/// ```
/// use relaybar::postfix;
///
/// let p = postfix! { "loss" => 0.51, "epoch" => 3 };
/// assert_eq!(p["loss"], "0.51");
/// ```
#[macro_export]
macro_rules! postfix {
    () => { $crate::Postfix::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Postfix::new();
        $(map.insert($key.to_string(), $value.to_string());)+
        map
    }};
}
