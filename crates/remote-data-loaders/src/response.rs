use bytes::Bytes;
use resilient_request::ResponseLike;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: u16,
    pub body: Bytes,
}

impl BufferedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Read the whole body of `response`.
    pub async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(Self { status, body })
    }
}

impl ResponseLike for BufferedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_json_body() {
        let response = BufferedResponse::new(200, r#"[{"enabled":true}]"#);
        assert!(response.is_ok());
        let rows: Vec<Value> = response.json().unwrap();
        assert_eq!(rows[0]["enabled"], Value::Bool(true));
    }

    #[test]
    fn test_clone_shares_body() {
        let response = BufferedResponse::new(404, "not here");
        let copy = response.clone();
        assert!(!copy.is_ok());
        assert_eq!(copy.text(), "not here");
        assert_eq!(response.body.as_ptr(), copy.body.as_ptr());
    }
}
