use std::sync::Arc;
use log::{debug, info};
use parking_lot::Mutex;
use crate::events::{Emitter, Pipe};
use crate::flow::Socket;
use crate::session::{Session, SessionEvent, State};

pub trait Handler: Send + Sync {
    fn session(&self, proxy: SessionProxy);
}

#[derive(Clone)]
pub struct SessionProxy {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    session: Session,
    events:  Emitter<SessionEvent>,
    pipe:    Mutex<Option<Pipe<SessionEvent>>>,
}

#[derive(Clone, Default)]
pub struct Plugins {
    inner: Arc<Mutex<Registry>>,
}

#[derive(Default)]
struct Registry {
    handler: Option<Arc<dyn Handler>>,
    proxies: Vec<SessionProxy>,
}

impl SessionProxy {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                session: session,
                events:  Emitter::new(),
                pipe:    Mutex::new(None),
            }),
        }
    }

    pub fn connect(&self) {
        let mut pipe = self.inner.pipe.lock();
        if pipe.is_none() {
            *pipe = Some(self.inner.session.events().pipe(&self.inner.events));
        }
    }

    pub fn close(&self) {
        if let Some(mut pipe) = self.inner.pipe.lock().take() {
            pipe.close();
            debug!("proxy for session {} closed", self.inner.session);
        }
        self.inner.events.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.pipe.lock().is_some()
    }

    pub fn events(&self) -> &Emitter<SessionEvent> {
        &self.inner.events
    }

    pub fn main(&self) -> Socket {
        self.inner.session.main().clone()
    }

    pub fn bulle(&self) -> Option<Socket> {
        self.inner.session.bulle()
    }

    pub fn state(&self) -> State {
        self.inner.session.state()
    }

    pub fn is_active(&self) -> bool {
        self.inner.session.is_active()
    }

    fn session(&self) -> &Session {
        &self.inner.session
    }
}

impl Plugins {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        let registry = Registry {
            handler: Some(handler),
            proxies: Vec::new(),
        };
        Self { inner: Arc::new(Mutex::new(registry)) }
    }

    // The handler subscribes before the proxy is connected.
    pub fn add(&self, session: &Session) {
        let proxy = SessionProxy::new(session.clone());

        let handler = {
            let mut registry = self.inner.lock();
            registry.prune();
            registry.proxies.push(proxy.clone());
            registry.handler.clone()
        };

        if let Some(handler) = handler {
            handler.session(proxy.clone());
        }
        proxy.connect();
    }

    pub fn reload(&self, handler: Arc<dyn Handler>) {
        let proxies = {
            let mut registry = self.inner.lock();
            registry.prune();

            let proxies = registry.proxies.drain(..).map(|old| {
                old.close();
                SessionProxy::new(old.session().clone())
            }).collect::<Vec<_>>();

            registry.proxies = proxies.clone();
            registry.handler = Some(handler.clone());
            proxies
        };

        info!("handler reloaded for {} sessions", proxies.len());

        for proxy in proxies {
            handler.session(proxy.clone());
            proxy.connect();
        }
    }

    pub fn detach(&self) {
        let mut registry = self.inner.lock();
        for proxy in registry.proxies.drain(..) {
            proxy.close();
        }
        registry.handler = None;
    }

    pub fn sessions(&self) -> Vec<Session> {
        let registry = self.inner.lock();
        registry.proxies.iter().filter(|p| p.is_active()).map(|p| p.session().clone()).collect()
    }
}

impl Registry {
    fn prune(&mut self) {
        self.proxies.retain(|proxy| {
            if !proxy.is_active() {
                proxy.close();
            }
            proxy.is_active()
        });
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;
    use crate::events::Subscription;
    use crate::flow::{FlowKey, Host, Socket};
    use crate::session::{Session, SessionEvent};
    use super::{Handler, Plugins, SessionProxy};

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        subs:  Mutex<Vec<Subscription<SessionEvent>>>,
    }

    impl Handler for Recorder {
        fn session(&self, proxy: SessionProxy) {
            assert!(!proxy.is_connected());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.subs.lock().push(proxy.events().subscribe());
        }
    }

    fn session() -> Session {
        let (ctl, _) = tokio::sync::mpsc::unbounded_channel();
        let host = |port| Host::new([10, 0, 0, 1].into(), port);
        let key  = FlowKey::new(host(50_000), host(443), true);
        Session::new(Socket::new(1, key, ctl)).unwrap()
    }

    #[test]
    fn proxy_forwards_until_closed() {
        let session = session();
        let proxy   = SessionProxy::new(session.clone());
        let mut sub = proxy.events().subscribe();

        proxy.connect();
        proxy.connect();
        assert_eq!(1, session.events().listeners());

        session.events().emit(SessionEvent::Closed);
        assert!(matches!(sub.try_recv(), Some(SessionEvent::Closed)));

        proxy.close();
        proxy.close();
        assert_eq!(0, session.events().listeners());
        assert!(session.is_active());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn reload_reattaches_without_leaks() {
        let first  = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let plugins = Plugins::new(first.clone());

        let (a, b) = (session(), session());
        plugins.add(&a);
        plugins.add(&b);

        assert_eq!(2, first.calls.load(Ordering::SeqCst));
        assert_eq!(1, a.events().listeners());

        a.events().emit(SessionEvent::Closed);
        assert!(first.subs.lock()[0].try_recv().is_some());

        for _ in 0..3 {
            plugins.reload(second.clone());
            assert_eq!(1, a.events().listeners());
            assert_eq!(1, b.events().listeners());
        }

        assert_eq!(6, second.calls.load(Ordering::SeqCst));
        assert_eq!(2, plugins.sessions().len());

        a.events().emit(SessionEvent::Closed);
        assert!(first.subs.lock()[0].try_recv().is_none());
        assert!(second.subs.lock()[4].try_recv().is_some());

        plugins.detach();
        assert_eq!(0, a.events().listeners());
        assert_eq!(0, b.events().listeners());
    }
}
