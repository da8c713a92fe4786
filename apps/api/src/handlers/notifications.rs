use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::{Extension, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::Stream;
use tracklet_application::NotificationStream;
use tracklet_core::UserIdentity;

use crate::dto::NotificationResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Streams change alerts for the signed-in user as server-sent events.
///
/// Dropping the connection drops the stream, which releases every
/// underlying store subscription.
pub async fn notifications_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Sse<KeepAliveStream<NotificationEvents>>> {
    let stream = state.notifier.watch(&user).await?;
    Ok(Sse::new(NotificationEvents { stream }).keep_alive(KeepAlive::default()))
}

pub struct NotificationEvents {
    stream: NotificationStream,
}

impl Stream for NotificationEvents {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.stream.poll_recv(cx) {
                Poll::Ready(Some(notification)) => {
                    match Event::default().json_data(NotificationResponse::from(notification)) {
                        Ok(event) => return Poll::Ready(Some(Ok(event))),
                        Err(error) => {
                            tracing::warn!(%error, "dropping unencodable notification");
                        }
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
