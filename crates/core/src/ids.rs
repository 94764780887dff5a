// SPDX-License-Identifier: MIT

//! Id newtypes. Every id in this system is supplied by the external platform on the wire —
//! none of them are generated locally — so each is a thin wrapper rather than a
//! generator-backed type.

crate::external_id!(
    /// Identifies the sync unit (the external-system entity) an invocation operates on.
    SyncUnitId
);

crate::external_id!(
    /// Identifies one sync run, spanning possibly many invocations.
    RunId
);

crate::external_id!(
    /// Identifies one invocation (one supervisor/worker process pair).
    RequestId
);

crate::external_id!(
    /// Identifies an uploaded artifact, assigned by the control plane on upload-url request.
    ArtifactId
);

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
