use thiserror::Error;

/// A response whose body was read completely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// Sends the request and reads the body, giving up once it exceeds
/// `limit_bytes`.
pub async fn send(limit_bytes: usize, req: reqwest::RequestBuilder) -> Result<Response, Error> {
    let mut res = req.send().await?;
    let status = res.status();
    let mut data = Vec::new();
    while let Some(chunk) = res.chunk().await? {
        if data.len() + chunk.len() > limit_bytes {
            return Err(Error::ResponseTooLarge { limit_bytes });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Response {
        status,
        body: String::from_utf8(data)?,
    })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("response error: {0:?}")]
    Response(#[from] reqwest::Error),
    #[error("the response was too large, the limit was {limit_bytes} bytes")]
    ResponseTooLarge { limit_bytes: usize },
    #[error("the response could not be parsed as UTF-8: {0:?}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Response(err) if err.is_timeout())
    }
}
