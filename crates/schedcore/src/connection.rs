use crate::internal::messages::negotiate::{FromScheddMessage, ToScheddMessage};
use crate::internal::negotiate::channel::ScheddChannel;
use crate::internal::transfer::codec::{deserialize, frame_codec, serialize};
use bytes::{Bytes, BytesMut};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

type Codec = Framed<TcpStream, LengthDelimitedCodec>;

/// Framed, typed connection. Every message travels in its own frame.
pub struct Connection<ReceiveMsg, SendMsg> {
    writer: SplitSink<Codec, Bytes>,
    reader: SplitStream<Codec>,
    _r: PhantomData<ReceiveMsg>,
    _s: PhantomData<SendMsg>,
}

impl<R: DeserializeOwned, S: Serialize> Connection<R, S> {
    pub async fn send(&mut self, item: S) -> crate::Result<()> {
        let data = serialize(&item)?;
        self.writer.send(data.into()).await?;
        Ok(())
    }

    pub async fn receive(&mut self) -> Option<crate::Result<R>> {
        self.reader.next().await.map(deserialize_message)
    }

    pub async fn send_and_receive(&mut self, item: S) -> crate::Result<R> {
        self.send(item).await?;
        match self.receive().await {
            Some(msg) => msg,
            None => Err(crate::Error::GenericError(
                "Expected response was not received".into(),
            )),
        }
    }

    pub fn init(socket: TcpStream) -> crate::Result<Self> {
        socket.set_nodelay(true)?;
        let connection = Framed::new(socket, frame_codec());
        let (writer, reader) = connection.split();
        Ok(Self {
            writer,
            reader,
            _r: Default::default(),
            _s: Default::default(),
        })
    }
}

fn deserialize_message<R: DeserializeOwned>(
    message: Result<BytesMut, std::io::Error>,
) -> crate::Result<R> {
    let message = message?;
    deserialize(&message)
}

impl ScheddChannel for Connection<FromScheddMessage, ToScheddMessage> {
    async fn send(&mut self, message: ToScheddMessage) -> crate::Result<()> {
        Connection::send(self, message).await
    }

    async fn receive(&mut self) -> crate::Result<FromScheddMessage> {
        match Connection::receive(self).await {
            Some(message) => message,
            None => Err(crate::Error::ProtocolError(
                "Schedd closed the connection".into(),
            )),
        }
    }
}
