//! Boundary with the host's class-loading machinery

/// Opaque identity of the class loader defining a class
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoaderId(pub u64);

/// Called by the host once for every class it loads, on the loading thread
pub trait ClassFileTransformer: Send + Sync {
    /// Produce replacement bytes for a class, or `None` to leave it as it is
    ///
    /// `class_name` is the internal name of the class (eg. `my/pkg/Klass`). The host may not
    /// know the name or the bytes, in which case the class is always left as it is.
    fn transform(
        &self,
        loader: Option<LoaderId>,
        class_name: Option<&str>,
        class_bytes: Option<&[u8]>,
    ) -> Option<Vec<u8>>;
}
