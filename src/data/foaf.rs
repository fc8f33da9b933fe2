//! FOAF document parsing
//!
//! Parsing happens in two steps. [`FoafDocument::parse`] walks the XML once
//! and records every `foaf:PersonalProfileDocument` and `foaf:Person` it finds
//! with the attributes and direct children we care about. Selecting the
//! document's maker and extracting [`Person`] records are then plain functions
//! over that structure.

use std::collections::HashMap;

use roxmltree::{Document, Node, ParsingOptions};

use super::Person;

/// FOAF namespace
pub const FOAF_NS: &str = "http://xmlns.com/foaf/0.1/";

/// RDF namespace
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// How a profile document points at the person who made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MakerRef {
    /// `rdf:nodeID="..."`, a blank node label
    NodeId(String),
    /// `rdf:resource="..."`, usually `#fragment`
    Resource(String),
    /// Any other attribute
    Other,
}

/// A `foaf:PersonalProfileDocument` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDocument {
    /// `rdf:about`; an empty string means "this document"
    pub about: Option<String>,
    /// First `foaf:maker` below the element
    pub maker: Option<MakerRef>,
}

/// A `foaf:Person` element and its direct children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonNode {
    pub node_id: Option<String>,
    pub rdf_id: Option<String>,
    pub resource: Option<String>,
    pub nick: Option<String>,
    pub name: Option<String>,
    pub member_name: Option<String>,
    pub image: Option<String>,
    /// `rdf:resource` of a direct `foaf:img` child
    pub img: Option<String>,
}

impl PersonNode {
    fn from_node(node: Node<'_, '_>) -> Self {
        let child_text = |tag: &str| {
            direct_child(node, tag)
                .and_then(|child| child.text())
                .map(str::to_string)
        };

        Self {
            node_id: attr(node, "nodeID"),
            rdf_id: attr(node, "ID"),
            resource: attr(node, "resource"),
            nick: child_text("nick"),
            name: child_text("name"),
            member_name: child_text("member_name"),
            image: child_text("image"),
            img: direct_child(node, "img").and_then(|child| attr(child, "resource")),
        }
    }

    /// Whether `maker` refers to this person.
    pub fn is_made_by(&self, maker: &MakerRef) -> bool {
        match maker {
            MakerRef::NodeId(id) => self.node_id.as_deref() == Some(id.as_str()),
            MakerRef::Resource(resource) => {
                let fragment = resource
                    .rsplit_once('#')
                    .map_or(resource.as_str(), |(_, fragment)| fragment);
                self.rdf_id.as_deref() == Some(fragment)
                    || self.resource.as_deref() == Some(resource.as_str())
            }
            MakerRef::Other => false,
        }
    }

    /// Builds a [`Person`]; `member_name` wins over `name`, `img` over `image`.
    ///
    /// Returns `None` without a nick.
    pub fn to_person(&self) -> Option<Person> {
        let nick = self.nick.clone()?;
        Some(Person {
            nick,
            name: self.member_name.clone().or_else(|| self.name.clone()),
            image: self.img.clone().or_else(|| self.image.clone()),
        })
    }
}

/// The parts of a FOAF document used to find people
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoafDocument {
    pub profile_documents: Vec<ProfileDocument>,
    pub people: Vec<PersonNode>,
}

impl FoafDocument {
    /// Parses XML text. Fails only when the text is not well-formed XML.
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options)?;

        let mut parsed = Self::default();
        for node in doc.descendants().filter(Node::is_element) {
            if node.has_tag_name((FOAF_NS, "PersonalProfileDocument")) {
                parsed.profile_documents.push(ProfileDocument {
                    about: attr(node, "about"),
                    maker: node
                        .descendants()
                        .find(|n| n.has_tag_name((FOAF_NS, "maker")))
                        .and_then(maker_ref),
                });
            } else if node.has_tag_name((FOAF_NS, "Person")) {
                parsed.people.push(PersonNode::from_node(node));
            }
        }
        Ok(parsed)
    }

    /// Maker of the first profile document that describes this document.
    pub fn maker(&self) -> Option<&MakerRef> {
        self.profile_documents
            .iter()
            .find(|doc| doc.about.as_deref() == Some(""))
            .and_then(|doc| doc.maker.as_ref())
    }

    /// The person the maker reference points at, if any.
    pub fn target(&self) -> Option<&PersonNode> {
        let maker = self.maker()?;
        self.people.iter().find(|person| person.is_made_by(maker))
    }

    /// People to extract records from.
    ///
    /// The maker's person alone when it resolves and has a nick, otherwise
    /// every person in the document.
    pub fn candidates(&self) -> Vec<&PersonNode> {
        match self.target() {
            Some(target) if target.nick.is_some() => vec![target],
            _ => self.people.iter().collect(),
        }
    }

    /// Extracted people keyed by nick. Later duplicates overwrite earlier ones.
    pub fn people_by_nick(&self) -> HashMap<String, Person> {
        self.candidates()
            .into_iter()
            .filter_map(PersonNode::to_person)
            .map(|person| (person.nick.clone(), person))
            .collect()
    }
}

fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute((RDF_NS, name)).map(str::to_string)
}

fn direct_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name((FOAF_NS, tag)))
}

fn maker_ref(maker: Node<'_, '_>) -> Option<MakerRef> {
    let first = maker.attributes().next()?;
    let value = first.value().to_string();
    Some(match first.name() {
        "nodeID" => MakerRef::NodeId(value),
        "resource" => MakerRef::Resource(value),
        _ => MakerRef::Other,
    })
}
