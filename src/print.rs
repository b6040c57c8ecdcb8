use log::{info, warn};
use crate::codec::Frame;
use crate::plugin::{Handler, SessionProxy};
use crate::session::SessionEvent;

pub struct Printer;

impl Handler for Printer {
    fn session(&self, proxy: SessionProxy) {
        let main    = proxy.main();
        let mut sub = proxy.events().subscribe();

        tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                match event {
                    SessionEvent::BulleBound(new, Some(prev)) => {
                        info!("{}: bulle {} replaces {}", main, new, prev);
                    }
                    SessionEvent::BulleBound(new, None) => {
                        info!("{}: bulle {}", main, new);
                    }
                    SessionEvent::Received(socket, frame) => {
                        info!("{} <- {:?} ({} bytes)", socket, frame.identifier(), frame.data.len());
                    }
                    SessionEvent::Sent(socket, body, fingerprint) => {
                        let len = body.len();
                        let id  = Frame::new(body, 0).identifier();
                        info!("{} -> {:?} #{} ({} bytes)", socket, id, fingerprint, len);
                    }
                    SessionEvent::Closed   => info!("{}: session closed", main),
                    SessionEvent::Error(e) => warn!("{}: {}", main, e),
                }
            }
        });
    }
}
