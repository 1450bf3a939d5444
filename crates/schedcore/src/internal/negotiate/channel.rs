use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};

/// Duplex message channel between the negotiator and one scheduler.
///
/// Each `send` is one complete message (one frame); `receive` waits for the next
/// complete reply. A closed channel is reported as an error.
#[allow(async_fn_in_trait)]
pub trait ScheddChannel {
    async fn send(&mut self, message: ToScheddMessage) -> crate::Result<()>;
    async fn receive(&mut self) -> crate::Result<FromScheddMessage>;
}
