//! Request-scoped state threaded through pipeline stages

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::dto::DataObject;

/// Named partition of the request data a stage reads from and rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Body,
    Query,
    Params,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Body => "body",
            Bucket::Query => "query",
            Bucket::Params => "params",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller metadata captured when the request enters the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub method: String,
    pub endpoint: String,
    pub caller_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            caller_ip: None,
            user_agent: None,
        }
    }
}

/// Descriptor of one uploaded file. The pipeline checks descriptors only;
/// bytes are handled elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub field_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(
        field_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            original_name: original_name.into(),
        }
    }
}

/// One request's view for the pipeline: three JSON buckets, caller metadata,
/// uploaded-file descriptors and the DataObjects attached by validation
/// stages. Bucket reads never fail; absent data is an empty object.
#[derive(Debug)]
pub struct RequestContext {
    meta: RequestMeta,
    body: Value,
    query: Value,
    params: Value,
    file: Option<UploadedFile>,
    files: Vec<UploadedFile>,
    objects: IndexMap<String, DataObject>,
}

impl RequestContext {
    pub fn new(meta: RequestMeta) -> Self {
        Self {
            meta,
            body: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            params: Value::Object(Map::new()),
            file: None,
            files: Vec::new(),
            objects: IndexMap::new(),
        }
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    pub fn bucket(&self, bucket: Bucket) -> &Value {
        match bucket {
            Bucket::Body => &self.body,
            Bucket::Query => &self.query,
            Bucket::Params => &self.params,
        }
    }

    /// Replace a bucket wholesale. Stages write sanitized values here.
    pub fn set_bucket(&mut self, bucket: Bucket, value: Value) {
        match bucket {
            Bucket::Body => self.body = value,
            Bucket::Query => self.query = value,
            Bucket::Params => self.params = value,
        }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn with_body(mut self, value: Value) -> Self {
        self.body = value;
        self
    }

    pub fn with_query(mut self, value: Value) -> Self {
        self.query = value;
        self
    }

    pub fn with_params(mut self, value: Value) -> Self {
        self.params = value;
        self
    }

    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    pub fn set_file(&mut self, file: UploadedFile) {
        self.file = Some(file);
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.file = Some(file);
        self
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn set_files(&mut self, files: Vec<UploadedFile>) {
        self.files = files;
    }

    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = files;
        self
    }

    /// Attach a DataObject under `name`, replacing any earlier one.
    pub fn attach_object(&mut self, name: impl Into<String>, object: DataObject) {
        self.objects.insert(name.into(), object);
    }

    pub fn object(&self, name: &str) -> Option<&DataObject> {
        self.objects.get(name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut DataObject> {
        self.objects.get_mut(name)
    }

    pub fn take_object(&mut self, name: &str) -> Option<DataObject> {
        self.objects.shift_remove(name)
    }

    pub fn objects(&self) -> &IndexMap<String, DataObject> {
        &self.objects
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(RequestMeta::default())
    }
}
