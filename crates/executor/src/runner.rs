//! The seam between the batch executor and whatever actually performs one
//! logical request. Production code implements this with a provider
//! adapter plus an HTTP client (see `loadbench-provider`); tests implement
//! it with a scripted fake so executor/orchestrator behavior can be
//! verified without a live endpoint.

use async_trait::async_trait;

#[async_trait]
pub trait RequestRunner<Req, Resp, Err>: Send + Sync
where
    Req: Send + Sync,
    Resp: Send,
    Err: Send,
{
    async fn run(&self, request: &Req) -> Result<Resp, Err>;
}
