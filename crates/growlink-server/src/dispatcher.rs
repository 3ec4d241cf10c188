use growlink_frame::{
    descriptor_name, extract, Classifier, ClassifierConfig, DecodedRequest, Extraction,
    IncomingEvent, Method, Response,
};
use growlink_transport::{ByteSink, ByteSource};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pages::{render_page, Resource};
use crate::status::StatusSource;

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Where form posts are redirected to; also the form's action.
    pub redirect_location: String,
    /// Heading of every page.
    pub page_title: String,
    pub classifier: ClassifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            redirect_location: "/".to_string(),
            page_title: "Growbox".to_string(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Receives decoded form posts before the client is redirected.
pub trait PostHandler {
    fn handle_post(&mut self, request: &DecodedRequest);
}

impl<F: FnMut(&DecodedRequest)> PostHandler for F {
    fn handle_post(&mut self, request: &DecodedRequest) {
        self(request)
    }
}

/// Drops posted forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnorePosts;

impl PostHandler for IgnorePosts {
    fn handle_post(&mut self, request: &DecodedRequest) {
        debug!(path = %request.path, "ignoring form post");
    }
}

/// What the dispatcher sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// No HTTP response; the event is for the caller.
    None,
    Page(Resource),
    Redirect,
    NotFound,
}

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub event: IncomingEvent,
    pub request: Option<DecodedRequest>,
    pub action: Action,
    /// A send failed and the response was cut short.
    pub response_failed: bool,
}

impl Dispatch {
    fn idle(event: IncomingEvent) -> Self {
        Self {
            event,
            request: None,
            action: Action::None,
            response_failed: false,
        }
    }
}

/// Glues classifier, extractor and response framer together.
pub struct Dispatcher<S, H = IgnorePosts> {
    classifier: Classifier,
    status: S,
    post_handler: H,
    config: ServerConfig,
}

impl<S: StatusSource> Dispatcher<S, IgnorePosts> {
    pub fn new(status: S) -> Self {
        Self::with_config(status, ServerConfig::default())
    }

    pub fn with_config(status: S, config: ServerConfig) -> Self {
        Self {
            classifier: Classifier::with_config(config.classifier.clone()),
            status,
            post_handler: IgnorePosts,
            config,
        }
    }
}

impl<S: StatusSource, H: PostHandler> Dispatcher<S, H> {
    /// Replace the post handler.
    pub fn with_post_handler<P: PostHandler>(self, post_handler: P) -> Dispatcher<S, P> {
        Dispatcher {
            classifier: self.classifier,
            status: self.status,
            post_handler,
            config: self.config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    pub fn post_handler(&self) -> &H {
        &self.post_handler
    }

    /// Handle the next event on `link`.
    ///
    /// Blocks at most for the link's read timeout when nothing is pending.
    /// Events other than data are returned untouched for the caller.
    pub fn dispatch_once<L>(&mut self, link: &mut L) -> Result<Dispatch>
    where
        L: ByteSource + ByteSink + ?Sized,
    {
        let event = self.classifier.classify(link)?;
        let IncomingEvent::DataReceived {
            channel,
            payload_budget,
        } = event
        else {
            return Ok(Dispatch::idle(event));
        };

        let extraction = extract(link, channel, payload_budget)?;
        let mut response = Response::new(link, channel);

        let (request, action) = match extraction {
            Extraction::Request(request) => {
                let action = match request.method {
                    Method::Get => match Resource::from_path(&request.path) {
                        Some(resource) => {
                            response.ok_header();
                            if render_page(&mut response, resource, &self.status, &self.config)
                                .is_err()
                            {
                                debug!(%resource, "page rendering stopped");
                            }
                            response.finish_page();
                            Action::Page(resource)
                        }
                        None => {
                            response.not_found();
                            Action::NotFound
                        }
                    },
                    Method::Post => {
                        self.post_handler.handle_post(&request);
                        response.redirect(&self.config.redirect_location);
                        Action::Redirect
                    }
                };
                (Some(request), action)
            }
            Extraction::Unrecognized => {
                response.not_found();
                (None, Action::NotFound)
            }
        };

        let response_failed = response.failed();
        if response_failed {
            warn!(descriptor = descriptor_name(channel), ?action, "response cut short");
        } else {
            info!(descriptor = descriptor_name(channel), ?action, "request served");
        }

        Ok(Dispatch {
            event,
            request,
            action,
            response_failed,
        })
    }

    /// Write the page for `resource` to the console, unframed.
    ///
    /// Returns true if a console write failed.
    pub fn render_console<K: ByteSink + ?Sized>(&self, sink: &mut K, resource: Resource) -> bool {
        let mut response = Response::console(sink);
        response.begin_body();
        if render_page(&mut response, resource, &self.status, &self.config).is_err() {
            debug!(%resource, "console rendering stopped");
        }
        response.write(b"\r\n");
        response.finish_page();
        response.failed()
    }
}
