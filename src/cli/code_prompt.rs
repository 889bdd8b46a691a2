// Terminal side of the OAuth flow: print the consent URL and read back what
// the browser was redirected to.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::core::session::AuthError;
use crate::infra::identity::AuthorizationCodeReceiver;

pub struct StdinCodeReceiver;

#[async_trait]
impl AuthorizationCodeReceiver for StdinCodeReceiver {
    async fn receive(&self, authorization_url: &str) -> Result<Option<String>, AuthError> {
        let prompt = format!(
            "Open this URL in your browser and sign in with Google:\n\n  {}\n\n\
             Then paste the URL you were redirected to (or just the code) and press Enter.\n\
             Leave it empty to cancel.\n> ",
            authorization_url
        );

        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        stderr
            .flush()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        // EOF means nobody is there to answer
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
