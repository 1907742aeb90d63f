//! Install descriptor - the XML input the CLI resolves.
//!
//! A descriptor names one destination file and lists the entries to install
//! into it. Entry attributes and `<Value>` children are ordinary bindable
//! string properties; the whole document flows through the session pipeline
//! unchanged.
//!
//! ```xml
//! <InstallDescriptor file="data/system/custom_skill.cus">
//!   <Entry Index="{autoid=(5000;9999),setalias=(myskill)}" Name="{localkey=(skill_name)}">
//!     <Value>{skillid2=(super;GOK)}</Value>
//!     <Value>{skip}</Value>
//!   </Entry>
//! </InstallDescriptor>
//! ```

use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::error::BindingError;
use crate::schema::{BindingSchema, Installable, PropertyVisitor};
use crate::skip::{self, SkipInherit};

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorEntry {
    pub index: String,
    pub name: String,
    pub path: String,
    pub values: Vec<String>,
    /// Resolve this entry after the rest, so alias reads see their targets.
    pub do_last: bool,
}

impl DescriptorEntry {
    fn from_node(node: Node<'_, '_>) -> Result<Self, BindingError> {
        let index = node
            .attribute("Index")
            .ok_or_else(|| BindingError::Descriptor {
                details: "<Entry> is missing the Index attribute".to_string(),
            })?
            .to_string();

        let name = node.attribute("Name").unwrap_or_default().to_string();
        let path = node.attribute("Path").unwrap_or_default().to_string();
        let do_last = matches!(node.attribute("DoLast"), Some("true") | Some("1"));

        let values = node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("Value"))
            .map(|n| n.text().unwrap_or_default().trim().to_string())
            .collect();

        Ok(Self {
            index,
            name,
            path,
            values,
            do_last,
        })
    }
}

impl Installable for DescriptorEntry {
    fn index(&self) -> &str {
        &self.index
    }

    fn do_last(&self) -> bool {
        self.do_last
    }
}

impl BindingSchema for DescriptorEntry {
    fn visit_properties(&mut self, visit: &mut PropertyVisitor<'_>) -> Result<(), BindingError> {
        visit("Index", &mut self.index)?;
        visit("Name", &mut self.name)?;
        visit("Path", &mut self.path)?;
        for value in &mut self.values {
            visit("Value", value)?;
        }
        Ok(())
    }
}

impl SkipInherit for DescriptorEntry {
    fn inherit_from(&mut self, old: &Self) -> Result<(), BindingError> {
        skip::inherit_string(&mut self.name, &old.name);
        skip::inherit_string(&mut self.path, &old.path);
        skip::inherit_list("Value", &mut self.values, &old.values)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallDescriptor {
    /// Destination file path; doubles as the auto-ID collection identity.
    pub file: String,
    pub entries: Vec<DescriptorEntry>,
}

impl InstallDescriptor {
    pub fn parse(xml: &str) -> Result<Self, BindingError> {
        let doc = Document::parse(xml).map_err(|e| BindingError::Descriptor {
            details: e.to_string(),
        })?;

        let root = doc.root_element();
        if !root.has_tag_name("InstallDescriptor") {
            return Err(BindingError::Descriptor {
                details: format!(
                    "expected root <InstallDescriptor>, found <{}>",
                    root.tag_name().name()
                ),
            });
        }

        let file = root
            .attribute("file")
            .ok_or_else(|| BindingError::Descriptor {
                details: "<InstallDescriptor> is missing the file attribute".to_string(),
            })?
            .to_string();

        let entries = root
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("Entry"))
            .map(DescriptorEntry::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { file, entries })
    }

    pub fn load(path: &Path) -> Result<Self, BindingError> {
        let xml = fs::read_to_string(path)?;
        Self::parse(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <InstallDescriptor file="data/system/custom_skill.cus">
          <Entry Index="{autoid=(5000;9999)}" Name="kamehameha" Path="skill/GOK">
            <Value>{skillid2=(super;GOK)}</Value>
            <Value>42</Value>
          </Entry>
          <Entry Index="7" />
        </InstallDescriptor>
    "#;

    #[test]
    fn parse_sample() {
        let descriptor = InstallDescriptor::parse(SAMPLE).unwrap();
        assert_eq!(descriptor.file, "data/system/custom_skill.cus");
        assert_eq!(descriptor.entries.len(), 2);

        let first = &descriptor.entries[0];
        assert_eq!(first.index, "{autoid=(5000;9999)}");
        assert_eq!(first.name, "kamehameha");
        assert_eq!(first.path, "skill/GOK");
        assert_eq!(first.values, vec!["{skillid2=(super;GOK)}", "42"]);

        let second = &descriptor.entries[1];
        assert_eq!(second.index, "7");
        assert_eq!(second.name, "");
        assert!(second.values.is_empty());
        assert!(!second.do_last);
    }

    #[test]
    fn parse_do_last_flag() {
        let xml = r#"
            <InstallDescriptor file="f">
              <Entry Index="1" DoLast="true" />
              <Entry Index="2" DoLast="false" />
              <Entry Index="3" />
            </InstallDescriptor>
        "#;
        let descriptor = InstallDescriptor::parse(xml).unwrap();
        assert!(descriptor.entries[0].do_last);
        assert!(!descriptor.entries[1].do_last);
        assert!(!descriptor.entries[2].do_last);
    }

    #[test]
    fn reject_missing_index() {
        let xml = r#"<InstallDescriptor file="f"><Entry Name="x"/></InstallDescriptor>"#;
        let err = InstallDescriptor::parse(xml).unwrap_err();
        assert!(err.to_string().contains("MB-050"));
        assert!(err.to_string().contains("Index"));
    }

    #[test]
    fn reject_missing_file_attribute() {
        let err = InstallDescriptor::parse("<InstallDescriptor/>").unwrap_err();
        assert!(err.to_string().contains("file attribute"));
    }

    #[test]
    fn reject_wrong_root() {
        let err = InstallDescriptor::parse("<Other/>").unwrap_err();
        assert!(err.to_string().contains("InstallDescriptor"));
    }

    #[test]
    fn reject_malformed_xml() {
        assert!(InstallDescriptor::parse("<InstallDescriptor").is_err());
    }

    #[test]
    fn visit_covers_values() {
        let mut entry = DescriptorEntry {
            index: "1".to_string(),
            name: "n".to_string(),
            path: "p".to_string(),
            values: vec!["a".to_string(), "b".to_string()],
            do_last: false,
        };
        let mut names = Vec::new();
        entry
            .visit_properties(&mut |name, _| {
                names.push(name);
                Ok(())
            })
            .unwrap();
        assert_eq!(names, vec!["Index", "Name", "Path", "Value", "Value"]);
    }
}
