use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

pub struct Emitter<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    next: AtomicU64,
    subs: Mutex<Vec<(u64, Listener<E>)>>,
}

enum Listener<E> {
    Queue(UnboundedSender<E>),
    Pipe(Emitter<E>),
}

pub struct Subscription<E> {
    id:     u64,
    rx:     UnboundedReceiver<E>,
    source: Weak<Inner<E>>,
}

pub struct Pipe<E> {
    id:     u64,
    source: Weak<Inner<E>>,
}

impl<E: Clone> Emitter<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next: AtomicU64::new(0),
                subs: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn emit(&self, event: E) {
        let mut pipes = Vec::new();

        self.inner.subs.lock().retain(|(_, listener)| match listener {
            Listener::Queue(tx) => tx.send(event.clone()).is_ok(),
            Listener::Pipe(dst) => {
                pipes.push(dst.clone());
                true
            }
        });

        for pipe in pipes {
            pipe.emit(event.clone());
        }
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = unbounded_channel();
        let id = self.add(Listener::Queue(tx));
        Subscription {
            id:     id,
            rx:     rx,
            source: Arc::downgrade(&self.inner),
        }
    }

    pub fn pipe(&self, dst: &Emitter<E>) -> Pipe<E> {
        let id = self.add(Listener::Pipe(dst.clone()));
        Pipe {
            id:     id,
            source: Arc::downgrade(&self.inner),
        }
    }

    pub fn listeners(&self) -> usize {
        self.inner.subs.lock().len()
    }

    pub fn clear(&self) {
        self.inner.subs.lock().clear();
    }

    fn add(&self, listener: Listener<E>) -> u64 {
        let id = self.inner.next.fetch_add(1, Ordering::Relaxed);
        self.inner.subs.lock().push((id, listener));
        id
    }
}

impl<E> Inner<E> {
    fn remove(&self, id: u64) {
        self.subs.lock().retain(|(sub, _)| *sub != id);
    }
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<E: Clone> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Subscription<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(inner) = self.source.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl<E> Pipe<E> {
    pub fn close(&mut self) {
        if let Some(inner) = self.source.upgrade() {
            inner.remove(self.id);
        }
        self.source = Weak::new();
    }
}

impl<E> Drop for Pipe<E> {
    fn drop(&mut self) {
        self.close();
    }
}
