use std::{
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use log::{info, warn};

use crate::protocol::{Message, Status};

pub(crate) type Handler = dyn Fn(&Message) -> Vec<Message> + Send + Sync;

/// Loopback server answering each request with the frames its handler returns.
pub(crate) struct ScriptedServer {
    pub address: SocketAddr,
    pub connections: Arc<AtomicUsize>,
}

impl ScriptedServer {
    pub fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&Message) -> Vec<Message> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Arc<Handler> = Arc::new(handler);

        let counter = Arc::clone(&connections);
        thread::spawn(move || {
            info!("listening at {address}");
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let handler = Arc::clone(&handler);
                        thread::spawn(move || handle_connection(stream, handler));
                    }
                    Err(e) => warn!("broken connection: {e:?}"),
                }
            }
        });

        Self {
            address,
            connections,
        }
    }

    pub fn address(&self) -> String {
        self.address.to_string()
    }
}

fn handle_connection(mut stream: TcpStream, handler: Arc<Handler>) {
    while let Ok(request) = Message::read_from(&mut stream) {
        for reply in handler(&request) {
            if reply.write_to(&mut stream).is_err() {
                return;
            }
        }
    }
}

/// Accepts any user and answers every other request with `OK`.
pub(crate) fn accept_all(_: &Message) -> Vec<Message> {
    vec![Message::empty(Status::OK)]
}

pub(crate) fn data(status: Status, document: &str) -> Message {
    let mut body = status.0.to_be_bytes().to_vec();
    body.extend_from_slice(document.as_bytes());
    Message::new(Status::DATA, body)
}
