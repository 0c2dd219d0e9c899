//! Recording adapter for tests.

use super::*;

/// Adapter call recorded by [`FakeAdapter`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    AddService(OpId, Uuid),
    StartAdvertising(OpId, Uuid, Vec<u8>),
    Respond(ReadRequest, ReadOutcome),
    Cancel(OpId),
}

/// Adapter that records every call and never confirms anything on its own.
#[derive(Debug, Default)]
pub(crate) struct FakeAdapter {
    pub calls: Vec<Call>,
    /// Error returned by the next submission.
    pub reject: Option<AdapterError>,
}

impl FakeAdapter {
    /// Returns the number of submitted operations.
    pub fn submissions(&self) -> usize {
        (self.calls.iter())
            .filter(|c| matches!(c, Call::AddService(..) | Call::StartAdvertising(..)))
            .count()
    }

    fn submit(&mut self, c: Call) -> Result<(), AdapterError> {
        self.calls.push(c);
        self.reject.take().map_or(Ok(()), Err)
    }
}

impl RadioAdapter for FakeAdapter {
    fn add_service(&mut self, op: OpId, svc: &GattService) -> Result<(), AdapterError> {
        self.submit(Call::AddService(op, svc.uuid()))
    }

    fn start_advertising(
        &mut self,
        op: OpId,
        svc: Uuid,
        data: &AdvertisementData,
    ) -> Result<(), AdapterError> {
        self.submit(Call::StartAdvertising(op, svc, data.encode().as_ref().to_vec()))
    }

    fn respond_to_read(&mut self, req: &ReadRequest, out: ReadOutcome) {
        self.calls.push(Call::Respond(req.clone(), out));
    }

    fn cancel(&mut self, op: OpId) {
        self.calls.push(Call::Cancel(op));
    }
}
