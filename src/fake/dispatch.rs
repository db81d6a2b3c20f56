//! Routing of typed actions onto store operations.

use tracing::debug;

use super::action::{Action, Object, Outcome, Resource, Verb};
use super::FakeOpenShift;
use crate::{Error, Result};

const SUBRESOURCE_LAYERS: &str = "layers";
const SUBRESOURCE_SECRETS: &str = "secrets";

impl FakeOpenShift {
    /// Serve one action the way the control plane API would.
    ///
    /// Unknown `(verb, resource, subresource)` combinations yield
    /// [`Error::NotImplemented`].
    pub fn dispatch(&self, action: Action) -> Result<Outcome> {
        debug!(
            verb = %action.verb,
            resource = %action.resource,
            subresource = %action.subresource,
            namespace = %action.namespace,
            name = %action.name,
            "dispatching action"
        );

        let Action {
            verb,
            resource,
            subresource,
            namespace,
            name,
            object,
        } = action;

        match (verb, resource, subresource.as_str()) {
            (Verb::Create, Resource::Image, "") => match object {
                Some(Object::Image(image)) => self.create_image(image).map(Outcome::Image),
                other => Err(wrong_object(verb, resource, other)),
            },
            (Verb::Get, Resource::Image, "") => self.get_image(&name).map(Outcome::Image),
            (Verb::List, Resource::Image, "") => Ok(Outcome::ImageList(self.list_images(&namespace))),
            (Verb::Update, Resource::Image, "") => match object {
                Some(Object::Image(image)) => self.update_image(image).map(Outcome::Image),
                other => Err(wrong_object(verb, resource, other)),
            },

            (Verb::Create, Resource::ImageStream, "") => match object {
                Some(Object::ImageStream(mut is)) => {
                    is.metadata.namespace = namespace;
                    self.create_image_stream(is).map(Outcome::ImageStream)
                }
                other => Err(wrong_object(verb, resource, other)),
            },
            (Verb::Get, Resource::ImageStream, "") => self
                .get_image_stream(&namespace, &name)
                .map(Outcome::ImageStream),
            (Verb::List, Resource::ImageStream, "") => Ok(Outcome::ImageStreamList(
                self.list_image_streams(&namespace),
            )),
            (Verb::Update, Resource::ImageStream, "") => match object {
                Some(Object::ImageStream(mut is)) => {
                    is.metadata.namespace = namespace;
                    self.update_image_stream(is).map(Outcome::ImageStream)
                }
                other => Err(wrong_object(verb, resource, other)),
            },
            (Verb::Get, Resource::ImageStream, SUBRESOURCE_LAYERS) => self
                .get_image_stream_layers(&namespace, &name)
                .map(Outcome::ImageStreamLayers),
            (Verb::Get, Resource::ImageStream, SUBRESOURCE_SECRETS) => self
                .get_image_stream_secrets(&namespace, &name)
                .map(Outcome::SecretList),

            (Verb::Create, Resource::ImageStreamMapping, "") => match object {
                Some(Object::ImageStreamMapping(ism)) => self
                    .create_image_stream_mapping(&namespace, ism)
                    .map(Outcome::ImageStreamMapping),
                other => Err(wrong_object(verb, resource, other)),
            },

            (Verb::Create, Resource::ImageStreamTag, "") => match object {
                Some(Object::ImageStreamTag(ist)) => self
                    .create_image_stream_tag(&namespace, ist)
                    .map(Outcome::ImageStreamTag),
                other => Err(wrong_object(verb, resource, other)),
            },

            (Verb::Get, Resource::ImageStreamImage, "") => self
                .get_image_stream_image(&namespace, &name)
                .map(Outcome::ImageStreamImage),

            _ => Err(Error::NotImplemented {
                verb: verb.to_string(),
                resource: resource.to_string(),
                subresource: subresource.clone(),
            }),
        }
    }
}

fn wrong_object(verb: Verb, resource: Resource, object: Option<Object>) -> Error {
    match object {
        Some(o) => Error::BadRequest(format!(
            "{verb} {resource} expects a matching object, got {}",
            o.resource()
        )),
        None => Error::BadRequest(format!("{verb} {resource} requires an object")),
    }
}
