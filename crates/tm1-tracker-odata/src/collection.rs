//! Server-driven paging.
//!
//! A single logical collection fetch may arrive as several responses. Each
//! response but the last carries a next link; the client keeps following
//! links until none is returned. Pages are already available on the server,
//! so there is no delay between them.

use crate::client::ODataClient;
use crate::continuation::ResponseProcessor;
use crate::error::TrackerError;
use crate::transport::Transport;

impl<T: Transport> ODataClient<T> {
    /// Walk the collection at `path` to exhaustion.
    ///
    /// Every page is handed to `processor`; only the returned next link is
    /// used, a delta link is ignored. Returns the number of pages processed.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a status other than `200 OK`, or
    /// if the processor fails. Pages processed before the failure are not
    /// revisited.
    pub async fn iterate_collection<P>(
        &self,
        path: &str,
        processor: &mut P,
    ) -> Result<usize, TrackerError>
    where
        P: ResponseProcessor + ?Sized,
    {
        let mut pages = 0;
        let mut link = Some(path.to_string()).filter(|p| !p.is_empty());

        while let Some(current) = link {
            let continuation = self.fetch_page(&current, false, processor).await?;
            pages += 1;
            tracing::debug!(
                page = pages,
                next_link = ?continuation.next_link,
                "Collection page processed"
            );
            link = continuation.next_link;
        }

        Ok(pages)
    }
}
