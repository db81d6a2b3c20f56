//! Typed requests accepted by the fake and the results it returns.

use std::fmt;

use crate::api::{
    Image, ImageStream, ImageStreamImage, ImageStreamLayers, ImageStreamMapping, ImageStreamTag,
    SecretList, RESOURCE_IMAGES, RESOURCE_IMAGE_STREAMS, RESOURCE_IMAGE_STREAM_IMAGES,
    RESOURCE_IMAGE_STREAM_MAPPINGS, RESOURCE_IMAGE_STREAM_TAGS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Get,
    List,
    Update,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Create => write!(f, "create"),
            Verb::Get => write!(f, "get"),
            Verb::List => write!(f, "list"),
            Verb::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Image,
    ImageStream,
    ImageStreamMapping,
    ImageStreamTag,
    ImageStreamImage,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Image => RESOURCE_IMAGES,
            Resource::ImageStream => RESOURCE_IMAGE_STREAMS,
            Resource::ImageStreamMapping => RESOURCE_IMAGE_STREAM_MAPPINGS,
            Resource::ImageStreamTag => RESOURCE_IMAGE_STREAM_TAGS,
            Resource::ImageStreamImage => RESOURCE_IMAGE_STREAM_IMAGES,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body of a create or update.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Image(Image),
    ImageStream(ImageStream),
    ImageStreamMapping(ImageStreamMapping),
    ImageStreamTag(ImageStreamTag),
}

impl Object {
    pub fn resource(&self) -> Resource {
        match self {
            Object::Image(_) => Resource::Image,
            Object::ImageStream(_) => Resource::ImageStream,
            Object::ImageStreamMapping(_) => Resource::ImageStreamMapping,
            Object::ImageStreamTag(_) => Resource::ImageStreamTag,
        }
    }

    /// `(namespace, name)` from the object's metadata.
    pub fn key(&self) -> (&str, &str) {
        let meta = match self {
            Object::Image(o) => &o.metadata,
            Object::ImageStream(o) => &o.metadata,
            Object::ImageStreamMapping(o) => &o.metadata,
            Object::ImageStreamTag(o) => &o.metadata,
        };
        (&meta.namespace, &meta.name)
    }
}

/// A single request against the control plane.
///
/// `namespace` and `name` are always populated at construction; for creates
/// and updates they are taken from the object unless overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub verb: Verb,
    pub resource: Resource,
    pub subresource: String,
    pub namespace: String,
    pub name: String,
    pub object: Option<Object>,
}

impl Action {
    pub fn get(resource: Resource, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            verb: Verb::Get,
            resource,
            subresource: String::new(),
            namespace: namespace.into(),
            name: name.into(),
            object: None,
        }
    }

    pub fn list(resource: Resource, namespace: impl Into<String>) -> Self {
        Self {
            verb: Verb::List,
            resource,
            subresource: String::new(),
            namespace: namespace.into(),
            name: String::new(),
            object: None,
        }
    }

    pub fn create(object: Object) -> Self {
        Self::with_object(Verb::Create, object)
    }

    pub fn update(object: Object) -> Self {
        Self::with_object(Verb::Update, object)
    }

    fn with_object(verb: Verb, object: Object) -> Self {
        let (namespace, name) = object.key();
        Self {
            verb,
            resource: object.resource(),
            subresource: String::new(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            object: Some(object),
        }
    }

    pub fn subresource(mut self, subresource: impl Into<String>) -> Self {
        self.subresource = subresource.into();
        self
    }

    /// Override the namespace, e.g. for objects whose metadata leaves it empty.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Result of a dispatched action.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Image(Image),
    ImageList(Vec<Image>),
    ImageStream(ImageStream),
    ImageStreamList(Vec<ImageStream>),
    ImageStreamLayers(ImageStreamLayers),
    SecretList(SecretList),
    ImageStreamMapping(ImageStreamMapping),
    ImageStreamTag(ImageStreamTag),
    ImageStreamImage(ImageStreamImage),
}
