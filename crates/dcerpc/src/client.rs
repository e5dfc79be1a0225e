//! Client invocation path

use msrpc_ndr::{NdrReader, NdrWriter};
use tracing::{debug, trace};

use crate::config::CallOptions;
use crate::connection::Connection;
use crate::error::{Result, RpcError};
use crate::operation::{Operation, Projection};

/// Run one call without looking at the status field.
///
/// Marshals the request, waits for the response through `conn` and
/// unmarshals it into the same operation. Faults are mapped to typed errors.
pub async fn invoke_unchecked<C, O>(conn: &C, op: &mut O, options: &CallOptions) -> Result<()>
where
    C: Connection + ?Sized,
    O: Operation + ?Sized,
{
    let opnum = op.opnum();
    let name = op.name();

    let mut w = NdrWriter::new();
    op.marshal_request(&mut w)?;
    let stub = w.into_bytes();
    debug!("Invoking {}: opnum={}, stub_len={}", name, opnum, stub.len());

    let call = conn.invoke(opnum, stub);
    let reply = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RpcError::Timeout)?,
        None => call.await,
    };
    let response = reply.map_err(|e| match e {
        RpcError::Fault(status) => {
            debug!("{} faulted: 0x{:08x}", name, status);
            RpcError::from_fault(status, opnum, name)
        }
        other => other,
    })?;

    trace!("Received response for {}: stub_len={}", name, response.len());
    op.unmarshal_response(&mut NdrReader::new(response))?;
    Ok(())
}

/// Run one call and map a non-zero status to [`RpcError::RemoteFailure`].
pub async fn invoke<C, O>(conn: &C, op: &mut O, options: &CallOptions) -> Result<()>
where
    C: Connection + ?Sized,
    O: Operation + ?Sized,
{
    invoke_unchecked(conn, op, options).await?;
    match op.status() {
        0 => Ok(()),
        status => {
            debug!("{} returned status 0x{:08x}", op.name(), status);
            Err(RpcError::RemoteFailure {
                operation: op.name(),
                status,
            })
        }
    }
}

/// Typed call: project `request` into a fresh operation, invoke it, and
/// project the response back out.
pub async fn call<C, O, Req, Resp>(conn: &C, request: Req, options: &CallOptions) -> Result<Resp>
where
    C: Connection + ?Sized,
    O: Operation + Default,
    Req: Projection<O>,
    Resp: Projection<O>,
{
    let mut op = O::default();
    request.into_op(&mut op);
    invoke(conn, &mut op, options).await?;
    Ok(Resp::from_op(&mut op))
}
