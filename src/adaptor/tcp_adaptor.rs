use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{error::Category, Deserializer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ChordAdaptor;
use crate::chord::message::{Request, Response};
use crate::chord::LocalNode;
use crate::error::{Error, Result};

/// An implementation of ChordAdaptor that talks JSON over TCP. Bind strings
/// are socket addresses. Each call opens its own connection.
#[derive(Debug, Default, Clone)]
pub struct TCPAdaptor;

impl TCPAdaptor {
	pub fn new() -> Self {
		TCPAdaptor
	}

	async fn serve(node: Arc<LocalNode>, stream: TcpStream) {
		let peer = stream.peer_addr().ok();
		let mut stream = TcpChordStream::new(stream);
		loop {
			let request: Request = match stream.read().await {
				Ok(request) => request,
				Err(Error::Transport(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
				Err(e) => {
					warn!(?peer, error = %e, "dropping connection");
					break;
				}
			};
			let response = node.handle(request).await;
			if let Err(e) = stream.write(&response).await {
				warn!(?peer, error = %e, "failed to send response");
				break;
			}
		}
	}
}

#[async_trait]
impl ChordAdaptor for TCPAdaptor {
	async fn call(&self, bind: &str, request: Request) -> Result<Response> {
		let mut stream = TcpChordStream::new(TcpStream::connect(bind).await?);
		stream.write(&request).await?;
		stream.read().await
	}

	async fn listen(&self, node: Arc<LocalNode>) -> Result<Option<JoinHandle<()>>> {
		let listener = TcpListener::bind(node.bind()).await?;
		info!("Listening on {}", node.bind());
		let handle = tokio::spawn(async move {
			loop {
				match listener.accept().await {
					Ok((stream, peer)) => {
						debug!(%peer, "accepted connection");
						tokio::spawn(Self::serve(node.clone(), stream));
					}
					Err(e) => {
						error!(error = %e, "accept failed");
					}
				}
			}
		});
		Ok(Some(handle))
	}
}

/// Largest single message a peer may send, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 1 << 20;

/// A TCP stream carrying back-to-back JSON values.
struct TcpChordStream {
	stream: TcpStream,
	buffer: Vec<u8>,
	max_message_size: usize,
}

impl TcpChordStream {
	fn new(stream: TcpStream) -> Self {
		TcpChordStream {
			stream,
			buffer: Vec::new(),
			max_message_size: MAX_MESSAGE_SIZE,
		}
	}

	async fn read<T: DeserializeOwned>(&mut self) -> Result<T> {
		loop {
			// try to decode a complete value from what has arrived so far
			let decoded = {
				let mut values = Deserializer::from_slice(self.buffer.as_slice()).into_iter::<T>();
				match values.next() {
					Some(Ok(value)) => Some(Ok((value, values.byte_offset()))),
					Some(Err(e)) if e.classify() != Category::Eof => Some(Err(e)),
					_ => None,
				}
			};
			match decoded {
				Some(Ok((value, offset))) => {
					self.buffer.drain(..offset);
					return Ok(value);
				}
				Some(Err(e)) => return Err(e.into()),
				None => {}
			}

			let mut chunk = [0u8; 1024];
			match self.stream.read(&mut chunk).await {
				Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof).into()),
				Ok(len) => {
					self.buffer.extend_from_slice(&chunk[..len]);
					if self.buffer.len() > self.max_message_size {
						return Err(Error::MessageTooLarge {
							size: self.buffer.len(),
							limit: self.max_message_size,
						});
					}
				}
				Err(ref e) if e.kind() == ErrorKind::WouldBlock => continue,
				Err(e) => return Err(e.into()),
			}
		}
	}

	async fn write<T: Serialize>(&mut self, msg: &T) -> Result<()> {
		let raw = serde_json::to_vec(msg)?;
		self.stream.write_all(&raw).await?;
		self.stream.flush().await?;
		Ok(())
	}
}
