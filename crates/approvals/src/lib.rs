//! Internal requests and the invoice approval audit log.

pub mod log;
pub mod request;

pub use log::{
    ApprovalDecision, ApprovalLog, ApprovalLogCommand, ApprovalLogEvent, ApprovalLogId,
    ApprovalRecord, ApprovalRecorded, RecordApproval,
};
pub use request::{
    ChangeRequestStatus, CreateRequest, EmployeeDetails, MarkRequestInvoiced, REQUEST_TRANSITIONS,
    Request, RequestCommand, RequestCreated, RequestEvent, RequestId, RequestInvoiced,
    RequestLine, RequestStatus, RequestStatusChanged,
};
