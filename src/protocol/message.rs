//! Messages, message sets, and handler dispatch

use std::fmt;

use super::{DataBuffer, ErrorStatus, Reader, Result};
use crate::field::Field;

/// Object-safe view of any message.
///
/// Implemented for every [`Message`]; frames and handler fallbacks work
/// through it.
pub trait MessageBase: Field {
    /// Message name.
    fn name(&self) -> &'static str;

    /// Numeric message id.
    fn id(&self) -> u64;

    /// Transport value `index`, if the message carries one.
    fn transport_value(&self, index: usize) -> Option<u64>;

    /// Store transport value `index`; unknown indexes are ignored.
    fn set_transport_value(&mut self, index: usize, value: u64);
}

/// Concrete message type.
///
/// The payload is the message's [`Field`] implementation, usually generated
/// with [`field_group!`](crate::field_group), so payload equality and
/// serialization cover the listed members only. Transport fields live beside
/// the payload members and are exchanged with the frame by index.
pub trait Message: Field + Default + Clone + PartialEq {
    /// Numeric message id.
    const ID: u64;
    /// Message name.
    const NAME: &'static str;

    /// Transport value `index`, if the message carries one.
    fn transport_value(&self, index: usize) -> Option<u64> {
        let _ = index;
        None
    }

    /// Store transport value `index`; unknown indexes are ignored.
    fn set_transport_value(&mut self, index: usize, value: u64) {
        let _ = (index, value);
    }

    /// Append the payload to `buffer`; nothing is appended on failure.
    fn encode(&self, buffer: &mut DataBuffer) -> Result<()> {
        let start = buffer.len();
        let result = self.write(buffer.bytes_mut());
        if result.is_err() {
            buffer.truncate(start);
        }
        result
    }

    /// Decode a payload from `bytes`, returning the message and the number
    /// of bytes consumed. Derived fields are not refreshed.
    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let mut msg = Self::default();
        let mut reader = Reader::new(bytes);
        msg.read(&mut reader)?;
        Ok((msg, reader.position()))
    }
}

impl<M: Message> MessageBase for M {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn id(&self) -> u64 {
        M::ID
    }

    fn transport_value(&self, index: usize) -> Option<u64> {
        Message::transport_value(self, index)
    }

    fn set_transport_value(&mut self, index: usize, value: u64) {
        Message::set_transport_value(self, index, value);
    }
}

/// Handler methods every message set's handler trait shares.
pub trait MessageHandler {
    /// Fallback for messages without a dedicated handler method.
    fn handle_message(&mut self, msg: &dyn MessageBase) {
        let _ = msg;
    }

    /// Bytes the frame rejected, with the reason.
    fn handle_invalid_data(&mut self, bytes: &[u8], status: ErrorStatus) {
        let _ = (bytes, status);
    }
}

/// Closed set of messages a frame can decode.
///
/// Usually generated by [`message_set!`](crate::message_set).
pub trait MessageSet: Sized + fmt::Debug {
    /// Handler receiving decoded messages.
    type Handler: ?Sized + MessageHandler;

    /// Default-initialized message for `id`.
    fn create(id: u64) -> Option<Self>;

    /// Id of the held message.
    fn id(&self) -> u64;

    /// Held message.
    fn as_message(&self) -> &dyn MessageBase;

    /// Held message, mutably.
    fn as_message_mut(&mut self) -> &mut dyn MessageBase;

    /// Invoke the handler method matching the held message.
    fn dispatch(&self, handler: &mut Self::Handler);
}

/// Declare the messages of a protocol.
///
/// Generates the message enum (one variant per message type, named after
/// it), its [`MessageSet`] implementation, `From` conversions, and a handler
/// trait with one method per message. Unimplemented handler methods forward
/// to [`MessageHandler::handle_message`].
///
/// ```
/// use fieldwire::{field_group, message_set, IntField, Message, MessageHandler};
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Ping {
///     seq: IntField<u16>,
/// }
///
/// field_group!(Ping { seq });
///
/// impl Message for Ping {
///     const ID: u64 = 1;
///     const NAME: &'static str = "Ping";
/// }
///
/// message_set! {
///     /// Messages of the ping protocol.
///     pub enum PingMessage: PingHandler {
///         Ping => handle_ping,
///     }
/// }
///
/// struct Counter(usize);
///
/// impl MessageHandler for Counter {}
///
/// impl PingHandler for Counter {
///     fn handle_ping(&mut self, _msg: &Ping) {
///         self.0 += 1;
///     }
/// }
///
/// let mut counter = Counter(0);
/// fieldwire::MessageSet::dispatch(&PingMessage::from(Ping::default()), &mut counter);
/// assert_eq!(counter.0, 1);
/// ```
#[macro_export]
macro_rules! message_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $handler:ident {
            $($msg:ident => $method:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                #[doc = concat!("[`", stringify!($msg), "`] message")]
                $msg($msg),
            )+
        }

        #[doc = concat!("Handler of the messages in [`", stringify!($name), "`].")]
        $vis trait $handler: $crate::MessageHandler {
            $(
                #[doc = concat!("Handle a decoded [`", stringify!($msg), "`].")]
                fn $method(&mut self, msg: &$msg) {
                    self.handle_message(msg);
                }
            )+
        }

        impl $crate::MessageSet for $name {
            type Handler = dyn $handler;

            fn create(id: u64) -> ::core::option::Option<Self> {
                $(
                    if id == <$msg as $crate::Message>::ID {
                        return ::core::option::Option::Some(
                            Self::$msg(::core::default::Default::default()),
                        );
                    }
                )+
                ::core::option::Option::None
            }

            fn id(&self) -> u64 {
                match self {
                    $(Self::$msg(_) => <$msg as $crate::Message>::ID,)+
                }
            }

            fn as_message(&self) -> &dyn $crate::MessageBase {
                match self {
                    $(Self::$msg(msg) => msg,)+
                }
            }

            fn as_message_mut(&mut self) -> &mut dyn $crate::MessageBase {
                match self {
                    $(Self::$msg(msg) => msg,)+
                }
            }

            fn dispatch(&self, handler: &mut Self::Handler) {
                match self {
                    $(Self::$msg(msg) => handler.$method(msg),)+
                }
            }
        }

        $(
            impl ::core::convert::From<$msg> for $name {
                fn from(msg: $msg) -> Self {
                    Self::$msg(msg)
                }
            }
        )+
    };
}
