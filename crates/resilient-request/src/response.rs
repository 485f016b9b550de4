use serde::de::DeserializeOwned;

/// What the request loop needs from a response.
///
/// Implementations are buffered: the body can be read any number of times
/// and the response cloned freely.
pub trait ResponseLike: Clone + Send {
    fn status(&self) -> u16;

    fn body(&self) -> &[u8];

    /// 2xx
    fn is_ok(&self) -> bool {
        (200..300).contains(&self.status())
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.body())
    }
}
