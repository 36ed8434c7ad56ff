//! A single conversion request

use crate::config::NamespaceScope;
use crate::staging::StagingLayout;
use crate::types::{OperationKind, RequestId};

/// One conversion: which operation, where its files live
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    id: RequestId,
    kind: OperationKind,
    layout: StagingLayout,
}

impl ConversionRequest {
    /// New request with a fresh id, laid out for `scope`
    #[must_use]
    pub fn new(kind: OperationKind, scope: NamespaceScope) -> Self {
        let id = RequestId::new();
        Self {
            id,
            kind,
            layout: StagingLayout::for_scope(scope, id),
        }
    }

    /// Request with an explicit layout
    #[must_use]
    pub fn with_layout(id: RequestId, kind: OperationKind, layout: StagingLayout) -> Self {
        Self { id, kind, layout }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    /// Arguments passed to the native entry point
    ///
    /// The PNG-set call takes only the input path; its outputs land at
    /// `/{size}.png`.
    #[must_use]
    pub fn native_args(&self) -> Vec<&str> {
        let layout = &self.layout;
        match self.kind {
            OperationKind::Ico => vec![layout.input(), layout.ico_output()],
            OperationKind::PngSet => vec![layout.input()],
            OperationKind::Icns => vec![layout.input(), layout.icns_output()],
            OperationKind::All => vec![layout.input(), layout.both_prefix()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_args_use_literal_paths() {
        let args = |kind| {
            ConversionRequest::new(kind, NamespaceScope::Shared)
                .native_args()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(args(OperationKind::Ico), ["input.png", "output.ico"]);
        assert_eq!(args(OperationKind::PngSet), ["input.png"]);
        assert_eq!(args(OperationKind::Icns), ["input.png", "output.icns"]);
        assert_eq!(args(OperationKind::All), ["input.png", "/output_both"]);
    }

    #[test]
    fn per_request_args_are_prefixed() {
        let request = ConversionRequest::new(OperationKind::All, NamespaceScope::PerRequest);
        let prefix = format!("/req-{}", request.id());
        assert!(request.native_args().iter().all(|arg| arg.starts_with(&prefix)));
    }
}
