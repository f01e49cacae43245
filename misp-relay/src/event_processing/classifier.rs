//! Attribute classification
//!
//! Routes every raw attribute of an event into its parsed counterpart. The
//! three checks are independent; an attribute matching none of them is
//! dropped without a trace.

use crate::configuration::Configuration;
use crate::event_processing::ParsedEvent;
use crate::indicator::ActionableObject;
use misp_relay_common::RawEvent;

pub struct AttributeClassifier<'a> {
    config: &'a Configuration,
    expiration_date_time: String,
}

impl<'a> AttributeClassifier<'a> {
    /// `expiration_date_time` is stamped onto every actionable object
    pub fn new(config: &'a Configuration, expiration_date_time: String) -> Self {
        Self {
            config,
            expiration_date_time,
        }
    }

    pub fn classify(&self, raw: &RawEvent, parsed: &mut ParsedEvent) {
        for attribute in &raw.attributes {
            let attribute_type = attribute.attribute_type.as_str();

            if self.config.is_actor_name_type(attribute_type) {
                parsed.activity_group_names.push(attribute.value.clone());
            }
            if self.config.is_comment_type(attribute_type) {
                parsed.description.push_str(&attribute.value);
            }
            if self.config.is_actionable_type(attribute_type) {
                parsed.request_objects.push(ActionableObject::from_attribute(
                    attribute,
                    &self.expiration_date_time,
                ));
            }
        }
    }
}
