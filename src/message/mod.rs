//! Owned message handles with typed, cursor-based body access.

pub use self::message::Message;
mod message;

pub use self::message_kind::MessageKind;
mod message_kind;

#[cfg(test)]
mod tests;
