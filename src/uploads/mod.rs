mod storage;

pub use storage::{Bucket, DEFAULT_MAX_UPLOAD_BYTES, SizeLimitedBuffer, StoredBlob, UploadStorage};
