//! Request and response interceptors.
//!
//! An interceptor is an ordered hook the client runs on every outgoing
//! request or every received response. The client keeps one chain per
//! direction; entries are addressed by the `InterceptorId` returned from
//! `add`, and each call runs against a snapshot of the chain taken when the
//! call starts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::RequestFlags;
use crate::error::RequestError;
use crate::http::{HttpRequest, HttpResponse};

pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut HttpRequest, flags: RequestFlags) -> Result<(), RequestError>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut HttpRequest, RequestFlags) -> Result<(), RequestError> + Send + Sync,
{
    fn intercept(&self, request: &mut HttpRequest, flags: RequestFlags) -> Result<(), RequestError> {
        self(request, flags)
    }
}

pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, response: &mut HttpResponse, flags: RequestFlags) -> Result<(), RequestError>;
}

impl<F> ResponseInterceptor for F
where
    F: Fn(&mut HttpResponse, RequestFlags) -> Result<(), RequestError> + Send + Sync,
{
    fn intercept(&self, response: &mut HttpResponse, flags: RequestFlags) -> Result<(), RequestError> {
        self(response, flags)
    }
}

/// Handle returned when registering an interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

/// Ordered, id-addressed list of interceptors.
pub struct InterceptorChain<T: ?Sized> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(InterceptorId, Arc<T>)>>,
}

impl<T: ?Sized> Default for InterceptorChain<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> InterceptorChain<T> {
    pub fn add(&self, interceptor: Arc<T>) -> InterceptorId {
        let id = InterceptorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, interceptor));
        id
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, id: InterceptorId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, interceptor)| Arc::clone(interceptor))
            .collect()
    }
}

impl InterceptorChain<dyn RequestInterceptor> {
    pub fn apply(&self, request: &mut HttpRequest, flags: RequestFlags) -> Result<(), RequestError> {
        for interceptor in self.snapshot() {
            interceptor.intercept(request, flags)?;
        }
        Ok(())
    }
}

impl InterceptorChain<dyn ResponseInterceptor> {
    pub fn apply(&self, response: &mut HttpResponse, flags: RequestFlags) -> Result<(), RequestError> {
        for interceptor in self.snapshot() {
            interceptor.intercept(response, flags)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::http::HttpMethod;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/api".to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    fn tagging(tag: &'static str) -> Arc<dyn RequestInterceptor> {
        Arc::new(move |req: &mut HttpRequest, _: RequestFlags| -> Result<(), RequestError> {
            let trail = req.header("X-Trail").unwrap_or_default().to_string();
            req.set_header("X-Trail", format!("{trail}{tag}"));
            Ok(())
        })
    }

    #[test]
    fn runs_in_registration_order() {
        let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::default();
        chain.add(tagging("a"));
        chain.add(tagging("b"));
        let mut req = request();
        chain.apply(&mut req, RequestFlags::default()).unwrap();
        assert_eq!(req.header("X-Trail"), Some("ab"));
    }

    #[test]
    fn remove_by_id() {
        let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::default();
        let a = chain.add(tagging("a"));
        chain.add(tagging("b"));
        assert!(chain.remove(a));
        assert!(!chain.remove(a));
        let mut req = request();
        chain.apply(&mut req, RequestFlags::default()).unwrap();
        assert_eq!(req.header("X-Trail"), Some("b"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn first_error_stops_the_chain() {
        let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::default();
        chain.add(Arc::new(|_: &mut HttpRequest, _: RequestFlags| -> Result<(), RequestError> {
            Err(RequestError::Http(HttpError::new("blocked")))
        }));
        chain.add(tagging("never"));
        let mut req = request();
        let err = chain.apply(&mut req, RequestFlags::default()).unwrap_err();
        assert_eq!(err.as_http().unwrap().message, "blocked");
        assert_eq!(req.header("X-Trail"), None);
    }

    #[test]
    fn ids_are_unique() {
        let chain: InterceptorChain<dyn RequestInterceptor> = InterceptorChain::default();
        let a = chain.add(tagging("a"));
        let b = chain.add(tagging("b"));
        assert_ne!(a, b);
    }
}
