#[cfg(test)]
pub mod fixtures {
    use crate::fetcher::{FetchRequest, Fetcher, SessionPaths};
    use crate::notify::Mailer;
    use anyhow::{Result, bail};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;

    /// A fetcher that serves scripted (page, headers) pairs in order and
    /// records every requested URL.
    pub struct ScriptedFetcher {
        responses: RefCell<VecDeque<(Vec<u8>, Vec<u8>)>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl ScriptedFetcher {
        pub fn new(responses: Vec<(&[u8], &[u8])>) -> Self {
            Self {
                responses: RefCell::new(
                    responses
                        .into_iter()
                        .map(|(page, headers)| (page.to_vec(), headers.to_vec()))
                        .collect(),
                ),
                requests: RefCell::new(Vec::new()),
            }
        }

        /// Scripts the same page for every request, with empty headers.
        pub fn serving(page: &[u8], times: usize) -> Self {
            Self::new(vec![(page, b"" as &[u8]); times])
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, paths: &SessionPaths, req: &FetchRequest<'_>) -> Result<()> {
            self.requests.borrow_mut().push(req.url.to_string());
            let Some((page, headers)) = self.responses.borrow_mut().pop_front() else {
                bail!("no scripted response left for {}", req.url);
            };
            fs::write(&paths.page, page)?;
            fs::write(&paths.headers, headers)?;
            Ok(())
        }
    }

    /// A fetcher whose every request fails.
    pub struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, _paths: &SessionPaths, req: &FetchRequest<'_>) -> Result<()> {
            bail!("scripted failure for {}", req.url)
        }
    }

    /// A mailer that records recipients and message bodies.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: RefCell<Vec<(String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, recipient: &str, message: &Path) -> Result<()> {
            let body = fs::read_to_string(message)?;
            self.sent.borrow_mut().push((recipient.to_string(), body));
            Ok(())
        }
    }
}
