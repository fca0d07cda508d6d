//! Investigation file (`i_*.txt`) reader and writer
//!
//! The file is a sequence of upper-case section headers, each followed by a
//! small transposed table: the row label sits in column 0 and records occupy
//! columns 1..N.

use std::io::{Read, Write};

use log::{debug, warn};

use super::table_reader::read_records;
use super::IsaTabError;
use crate::model::{
    is_extended_date, Assay, Comment, Investigation, OntologyAnnotation, OntologySource, Person,
    Protocol, ProtocolComponent, ProtocolParameter, Publication, Study, StudyFactor,
};

const ONTOLOGY_SOURCE_REFERENCE: &str = "ONTOLOGY SOURCE REFERENCE";
const INVESTIGATION: &str = "INVESTIGATION";
const INVESTIGATION_PUBLICATIONS: &str = "INVESTIGATION PUBLICATIONS";
const INVESTIGATION_CONTACTS: &str = "INVESTIGATION CONTACTS";
const STUDY: &str = "STUDY";
const STUDY_DESIGN_DESCRIPTORS: &str = "STUDY DESIGN DESCRIPTORS";
const STUDY_PUBLICATIONS: &str = "STUDY PUBLICATIONS";
const STUDY_FACTORS: &str = "STUDY FACTORS";
const STUDY_ASSAYS: &str = "STUDY ASSAYS";
const STUDY_PROTOCOLS: &str = "STUDY PROTOCOLS";
const STUDY_CONTACTS: &str = "STUDY CONTACTS";

const SECTIONS: [&str; 11] = [
    ONTOLOGY_SOURCE_REFERENCE,
    INVESTIGATION,
    INVESTIGATION_PUBLICATIONS,
    INVESTIGATION_CONTACTS,
    STUDY,
    STUDY_DESIGN_DESCRIPTORS,
    STUDY_PUBLICATIONS,
    STUDY_FACTORS,
    STUDY_ASSAYS,
    STUDY_PROTOCOLS,
    STUDY_CONTACTS,
];

/// One section: labelled rows of values
#[derive(Debug, Default)]
struct Section {
    name: String,
    rows: Vec<(String, Vec<String>)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    /// Number of records, ignoring trailing empty cells
    fn count(&self) -> usize {
        self.rows
            .iter()
            .map(|(_, values)| {
                values
                    .iter()
                    .rposition(|v| !v.is_empty())
                    .map_or(0, |p| p + 1)
            })
            .max()
            .unwrap_or(0)
    }

    fn has(&self, label: &str) -> bool {
        self.rows.iter().any(|(l, _)| l == label)
    }

    fn get(&self, label: &str, i: usize) -> &str {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, values)| values.get(i))
            .map_or("", String::as_str)
    }

    fn annotation(&self, label: &str, i: usize) -> OntologyAnnotation {
        OntologyAnnotation::from_cells(
            self.get(label, i),
            self.get(&format!("{} Term Source REF", label), i),
            self.get(&format!("{} Term Accession Number", label), i),
        )
    }

    /// `;`-separated annotation lists (roles, parameters, component types)
    fn annotation_list(&self, label: &str, i: usize) -> Vec<OntologyAnnotation> {
        let terms = split_list(self.get(label, i));
        let sources = split_list(self.get(&format!("{} Term Source REF", label), i));
        let accessions = split_list(self.get(&format!("{} Term Accession Number", label), i));
        terms
            .iter()
            .enumerate()
            .map(|(k, term)| {
                OntologyAnnotation::from_cells(
                    term,
                    sources.get(k).map_or("", String::as_str),
                    accessions.get(k).map_or("", String::as_str),
                )
            })
            .collect()
    }

    fn comments(&self, i: usize) -> Vec<Comment> {
        self.rows
            .iter()
            .filter_map(|(label, values)| {
                let name = label.strip_prefix("Comment[")?.strip_suffix(']')?;
                let value = values.get(i).map_or("", String::as_str);
                (!value.is_empty()).then(|| Comment::new(name.trim(), value))
            })
            .collect()
    }

    fn require(&self, label: &str) -> Result<(), IsaTabError> {
        if self.count() > 0 && !self.has(label) {
            return Err(IsaTabError::MissingField {
                section: self.name.clone(),
                label: label.to_string(),
            });
        }
        Ok(())
    }
}

fn split_list(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    let mut items: Vec<String> = cell.split(';').map(|s| s.trim().to_string()).collect();
    while items.last().is_some_and(|s| s.is_empty()) {
        items.pop();
    }
    items
}

/// Split the file into sections, in file order
fn read_sections<R: Read>(reader: R, name: &str) -> Result<Vec<Section>, IsaTabError> {
    let mut sections: Vec<Section> = Vec::new();
    for (line, cells) in read_records(reader, name)? {
        let label = cells[0].as_str();
        if SECTIONS.contains(&label) && cells[1..].iter().all(|c| c.is_empty()) {
            sections.push(Section::new(label));
            continue;
        }
        let Some(section) = sections.last_mut() else {
            return Err(IsaTabError::MalformedRow {
                row: line,
                message: format!("'{}' appears before any section header", label),
            });
        };
        section.rows.push((label.to_string(), cells[1..].to_vec()));
    }
    Ok(sections)
}

/// Read an investigation file; study and assay tables are not loaded
pub fn read_investigation<R: Read>(reader: R) -> Result<Investigation, IsaTabError> {
    let sections = read_sections(reader, "investigation file")?;
    let mut investigation = Investigation::default();
    let mut seen_investigation = false;

    for section in &sections {
        debug!("Section {} with {} records", section.name, section.count());
        match section.name.as_str() {
            ONTOLOGY_SOURCE_REFERENCE => {
                section.require("Term Source Name")?;
                for i in 0..section.count() {
                    let mut source = OntologySource::new(section.get("Term Source Name", i))
                        .with_file(section.get("Term Source File", i))
                        .with_version(section.get("Term Source Version", i))
                        .with_description(section.get("Term Source Description", i));
                    source.comments = section.comments(i);
                    investigation.ontology_sources.push(source);
                }
            }
            INVESTIGATION => {
                seen_investigation = true;
                investigation.identifier = section.get("Investigation Identifier", 0).to_string();
                investigation.title = section.get("Investigation Title", 0).to_string();
                investigation.description =
                    section.get("Investigation Description", 0).to_string();
                investigation.submission_date =
                    section.get("Investigation Submission Date", 0).to_string();
                investigation.public_release_date =
                    section.get("Investigation Public Release Date", 0).to_string();
                investigation.comments = section.comments(0);
            }
            INVESTIGATION_PUBLICATIONS => {
                investigation.publications = read_publications(section, "Investigation");
            }
            INVESTIGATION_CONTACTS => {
                investigation.contacts = read_contacts(section, "Investigation");
            }
            STUDY => {
                section.require("Study Identifier")?;
                section.require("Study File Name")?;
                let mut study = Study::new(
                    section.get("Study Identifier", 0),
                    section.get("Study File Name", 0),
                );
                study.title = section.get("Study Title", 0).to_string();
                study.description = section.get("Study Description", 0).to_string();
                study.submission_date = section.get("Study Submission Date", 0).to_string();
                study.public_release_date =
                    section.get("Study Public Release Date", 0).to_string();
                study.comments = section.comments(0);
                investigation.studies.push(study);
            }
            other => {
                let Some(study) = investigation.studies.last_mut() else {
                    return Err(IsaTabError::MissingSection(STUDY.to_string()));
                };
                read_study_subsection(section, other, study)?;
            }
        }
    }

    check_dates(&investigation);
    if !seen_investigation {
        return Err(IsaTabError::MissingSection(INVESTIGATION.to_string()));
    }
    if investigation.studies.is_empty() {
        return Err(IsaTabError::MissingSection(STUDY.to_string()));
    }
    Ok(investigation)
}

fn check_dates(investigation: &Investigation) {
    let mut dates = vec![
        ("Investigation Submission Date", &investigation.submission_date),
        ("Investigation Public Release Date", &investigation.public_release_date),
    ];
    for study in &investigation.studies {
        dates.push(("Study Submission Date", &study.submission_date));
        dates.push(("Study Public Release Date", &study.public_release_date));
    }
    for (label, value) in dates {
        if !value.is_empty() && !is_extended_date(value) {
            warn!("{} '{}' is not YYYY-MM-DD", label, value);
        }
    }
}

fn read_study_subsection(
    section: &Section,
    name: &str,
    study: &mut Study,
) -> Result<(), IsaTabError> {
    match name {
        STUDY_DESIGN_DESCRIPTORS => {
            for i in 0..section.count() {
                let descriptor = section.annotation("Study Design Type", i);
                if !descriptor.is_empty() {
                    study.design_descriptors.push(descriptor);
                }
            }
        }
        STUDY_PUBLICATIONS => study.publications = read_publications(section, "Study"),
        STUDY_CONTACTS => study.contacts = read_contacts(section, "Study"),
        STUDY_FACTORS => {
            section.require("Study Factor Name")?;
            for i in 0..section.count() {
                let mut factor = StudyFactor::new(
                    section.get("Study Factor Name", i),
                    section.annotation("Study Factor Type", i),
                );
                factor.comments = section.comments(i);
                study.add_factor(factor)?;
            }
        }
        STUDY_ASSAYS => {
            section.require("Study Assay File Name")?;
            for i in 0..section.count() {
                let mut assay = Assay::new(section.get("Study Assay File Name", i));
                assay.measurement_type = section.annotation("Study Assay Measurement Type", i);
                assay.technology_type = section.annotation("Study Assay Technology Type", i);
                assay.technology_platform =
                    section.get("Study Assay Technology Platform", i).to_string();
                assay.comments = section.comments(i);
                study.assays.push(assay);
            }
        }
        STUDY_PROTOCOLS => {
            section.require("Study Protocol Name")?;
            for i in 0..section.count() {
                let mut protocol = Protocol::new(
                    section.get("Study Protocol Name", i),
                    section.annotation("Study Protocol Type", i),
                );
                protocol.description = section.get("Study Protocol Description", i).to_string();
                protocol.uri = section.get("Study Protocol URI", i).to_string();
                protocol.version = section.get("Study Protocol Version", i).to_string();
                protocol.parameters = section
                    .annotation_list("Study Protocol Parameters Name", i)
                    .into_iter()
                    .map(|name| ProtocolParameter { name })
                    .collect();
                let component_names = split_list(section.get("Study Protocol Components Name", i));
                let component_types =
                    section.annotation_list("Study Protocol Components Type", i);
                protocol.components = component_names
                    .into_iter()
                    .enumerate()
                    .map(|(k, name)| ProtocolComponent {
                        name,
                        component_type: component_types.get(k).cloned().unwrap_or_default(),
                    })
                    .collect();
                protocol.comments = section.comments(i);
                study.add_protocol(protocol)?;
            }
        }
        _ => warn!("Ignoring unexpected section {}", name),
    }
    Ok(())
}

fn read_publications(section: &Section, prefix: &str) -> Vec<Publication> {
    (0..section.count())
        .map(|i| Publication {
            pubmed_id: section.get(&format!("{} PubMed ID", prefix), i).to_string(),
            doi: section.get(&format!("{} Publication DOI", prefix), i).to_string(),
            author_list: section
                .get(&format!("{} Publication Author List", prefix), i)
                .to_string(),
            title: section.get(&format!("{} Publication Title", prefix), i).to_string(),
            status: section.annotation(&format!("{} Publication Status", prefix), i),
            comments: section.comments(i),
        })
        .collect()
}

fn read_contacts(section: &Section, prefix: &str) -> Vec<Person> {
    let field =
        |name: &str, i: usize| section.get(&format!("{} Person {}", prefix, name), i).to_string();
    (0..section.count())
        .map(|i| Person {
            last_name: field("Last Name", i),
            first_name: field("First Name", i),
            mid_initials: field("Mid Initials", i),
            email: field("Email", i),
            phone: field("Phone", i),
            fax: field("Fax", i),
            address: field("Address", i),
            affiliation: field("Affiliation", i),
            roles: section.annotation_list(&format!("{} Person Roles", prefix), i),
            comments: section.comments(i),
        })
        .collect()
}

/// Builder of one output section
struct SectionWriter {
    name: &'static str,
    rows: Vec<Vec<String>>,
}

impl SectionWriter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: Vec::new(),
        }
    }

    fn row(&mut self, label: &str, values: impl IntoIterator<Item = String>) {
        let mut row = vec![label.to_string()];
        row.extend(values);
        self.rows.push(row);
    }

    /// Term, accession and source rows of an annotation field
    fn annotation_rows<'a>(
        &mut self,
        label: &str,
        annotations: impl Iterator<Item = &'a OntologyAnnotation> + Clone,
    ) {
        self.row(label, annotations.clone().map(|a| a.term.clone()));
        self.row(
            &format!("{} Term Accession Number", label),
            annotations.clone().map(|a| a.term_accession.clone()),
        );
        self.row(
            &format!("{} Term Source REF", label),
            annotations.map(|a| a.source_name().to_string()),
        );
    }

    /// `;`-joined annotation lists, one per record
    fn annotation_list_rows(&mut self, label: &str, lists: &[&[OntologyAnnotation]]) {
        let join = |f: &dyn Fn(&OntologyAnnotation) -> String| -> Vec<String> {
            lists
                .iter()
                .map(|list| list.iter().map(f).collect::<Vec<_>>().join(";"))
                .collect()
        };
        self.row(label, join(&|a| a.term.clone()));
        self.row(
            &format!("{} Term Accession Number", label),
            join(&|a| a.term_accession.clone()),
        );
        self.row(
            &format!("{} Term Source REF", label),
            join(&|a| a.source_name().to_string()),
        );
    }

    /// `Comment[x]` rows over the union of comment names
    fn comment_rows(&mut self, records: &[&[Comment]]) {
        let mut names: Vec<&str> = Vec::new();
        for comments in records {
            for comment in comments.iter() {
                if !names.contains(&comment.name.as_str()) {
                    names.push(&comment.name);
                }
            }
        }
        for name in names {
            let values = records.iter().map(|comments| {
                comments
                    .iter()
                    .find(|c| c.name == name)
                    .map_or_else(String::new, |c| c.value.clone())
            });
            let values: Vec<String> = values.collect();
            self.row(&format!("Comment[{}]", name), values);
        }
    }

    fn write<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<(), IsaTabError> {
        writer.write_record([self.name])?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        Ok(())
    }
}

fn publications_section(
    name: &'static str,
    prefix: &str,
    publications: &[Publication],
) -> SectionWriter {
    let mut section = SectionWriter::new(name);
    let field = |f: fn(&Publication) -> &String| publications.iter().map(move |p| f(p).clone());
    section.row(&format!("{} PubMed ID", prefix), field(|p| &p.pubmed_id));
    section.row(&format!("{} Publication DOI", prefix), field(|p| &p.doi));
    section.row(
        &format!("{} Publication Author List", prefix),
        field(|p| &p.author_list),
    );
    section.row(&format!("{} Publication Title", prefix), field(|p| &p.title));
    section.annotation_rows(
        &format!("{} Publication Status", prefix),
        publications.iter().map(|p| &p.status),
    );
    let comments: Vec<&[Comment]> = publications.iter().map(|p| p.comments.as_slice()).collect();
    section.comment_rows(&comments);
    section
}

fn contacts_section(name: &'static str, prefix: &str, contacts: &[Person]) -> SectionWriter {
    let mut section = SectionWriter::new(name);
    let column = |f: fn(&Person) -> &String| contacts.iter().map(move |p| f(p).clone());
    let label = |name: &str| format!("{} Person {}", prefix, name);
    section.row(&label("Last Name"), column(|p| &p.last_name));
    section.row(&label("First Name"), column(|p| &p.first_name));
    section.row(&label("Mid Initials"), column(|p| &p.mid_initials));
    section.row(&label("Email"), column(|p| &p.email));
    section.row(&label("Phone"), column(|p| &p.phone));
    section.row(&label("Fax"), column(|p| &p.fax));
    section.row(&label("Address"), column(|p| &p.address));
    section.row(&label("Affiliation"), column(|p| &p.affiliation));
    let roles: Vec<&[OntologyAnnotation]> = contacts.iter().map(|p| p.roles.as_slice()).collect();
    section.annotation_list_rows(&format!("{} Person Roles", prefix), &roles);
    let comments: Vec<&[Comment]> = contacts.iter().map(|p| p.comments.as_slice()).collect();
    section.comment_rows(&comments);
    section
}

fn study_sections(study: &Study) -> Vec<SectionWriter> {
    let mut sections = Vec::new();

    let mut header = SectionWriter::new(STUDY);
    header.row("Study Identifier", [study.identifier.clone()]);
    header.row("Study Title", [study.title.clone()]);
    header.row("Study Description", [study.description.clone()]);
    header.row("Study Submission Date", [study.submission_date.clone()]);
    header.row("Study Public Release Date", [study.public_release_date.clone()]);
    header.row("Study File Name", [study.filename.clone()]);
    header.comment_rows(&[study.comments.as_slice()]);
    sections.push(header);

    let mut design = SectionWriter::new(STUDY_DESIGN_DESCRIPTORS);
    design.annotation_rows("Study Design Type", study.design_descriptors.iter());
    sections.push(design);

    sections.push(publications_section(
        STUDY_PUBLICATIONS,
        "Study",
        &study.publications,
    ));

    let mut factors = SectionWriter::new(STUDY_FACTORS);
    factors.row("Study Factor Name", study.factors.iter().map(|f| f.name.clone()));
    factors.annotation_rows("Study Factor Type", study.factors.iter().map(|f| &f.factor_type));
    let comments: Vec<&[Comment]> = study.factors.iter().map(|f| f.comments.as_slice()).collect();
    factors.comment_rows(&comments);
    sections.push(factors);

    let mut assays = SectionWriter::new(STUDY_ASSAYS);
    assays.row("Study Assay File Name", study.assays.iter().map(|a| a.filename.clone()));
    assays.annotation_rows(
        "Study Assay Measurement Type",
        study.assays.iter().map(|a| &a.measurement_type),
    );
    assays.annotation_rows(
        "Study Assay Technology Type",
        study.assays.iter().map(|a| &a.technology_type),
    );
    assays.row(
        "Study Assay Technology Platform",
        study.assays.iter().map(|a| a.technology_platform.clone()),
    );
    let comments: Vec<&[Comment]> = study.assays.iter().map(|a| a.comments.as_slice()).collect();
    assays.comment_rows(&comments);
    sections.push(assays);

    let mut protocols = SectionWriter::new(STUDY_PROTOCOLS);
    let list = &study.protocols;
    protocols.row("Study Protocol Name", list.iter().map(|p| p.name.clone()));
    protocols.annotation_rows("Study Protocol Type", list.iter().map(|p| &p.protocol_type));
    protocols.row("Study Protocol Description", list.iter().map(|p| p.description.clone()));
    protocols.row("Study Protocol URI", list.iter().map(|p| p.uri.clone()));
    protocols.row("Study Protocol Version", list.iter().map(|p| p.version.clone()));
    let parameters: Vec<Vec<OntologyAnnotation>> = list
        .iter()
        .map(|p| p.parameters.iter().map(|x| x.name.clone()).collect())
        .collect();
    let parameter_refs: Vec<&[OntologyAnnotation]> = parameters.iter().map(Vec::as_slice).collect();
    protocols.annotation_list_rows("Study Protocol Parameters Name", &parameter_refs);
    protocols.row(
        "Study Protocol Components Name",
        list.iter().map(|p| {
            p.components
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(";")
        }),
    );
    let component_types: Vec<Vec<OntologyAnnotation>> = list
        .iter()
        .map(|p| p.components.iter().map(|c| c.component_type.clone()).collect())
        .collect();
    let component_refs: Vec<&[OntologyAnnotation]> =
        component_types.iter().map(Vec::as_slice).collect();
    protocols.annotation_list_rows("Study Protocol Components Type", &component_refs);
    let comments: Vec<&[Comment]> = list.iter().map(|p| p.comments.as_slice()).collect();
    protocols.comment_rows(&comments);
    sections.push(protocols);

    sections.push(contacts_section(STUDY_CONTACTS, "Study", &study.contacts));
    sections
}

/// Write an investigation file
pub fn write_investigation<W: Write>(
    investigation: &Investigation,
    writer: W,
) -> Result<(), IsaTabError> {
    if investigation.identifier.trim().is_empty() {
        return Err(IsaTabError::MissingField {
            section: INVESTIGATION.to_string(),
            label: "Investigation Identifier".to_string(),
        });
    }
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    let mut sections = Vec::new();

    let mut sources = SectionWriter::new(ONTOLOGY_SOURCE_REFERENCE);
    let list = &investigation.ontology_sources;
    sources.row("Term Source Name", list.iter().map(|s| s.name.clone()));
    sources.row("Term Source File", list.iter().map(|s| s.file.clone()));
    sources.row("Term Source Version", list.iter().map(|s| s.version.clone()));
    sources.row("Term Source Description", list.iter().map(|s| s.description.clone()));
    let comments: Vec<&[Comment]> = list.iter().map(|s| s.comments.as_slice()).collect();
    sources.comment_rows(&comments);
    sections.push(sources);

    let mut header = SectionWriter::new(INVESTIGATION);
    header.row("Investigation Identifier", [investigation.identifier.clone()]);
    header.row("Investigation Title", [investigation.title.clone()]);
    header.row("Investigation Description", [investigation.description.clone()]);
    header.row(
        "Investigation Submission Date",
        [investigation.submission_date.clone()],
    );
    header.row(
        "Investigation Public Release Date",
        [investigation.public_release_date.clone()],
    );
    header.comment_rows(&[investigation.comments.as_slice()]);
    sections.push(header);

    sections.push(publications_section(
        INVESTIGATION_PUBLICATIONS,
        "Investigation",
        &investigation.publications,
    ));
    sections.push(contacts_section(
        INVESTIGATION_CONTACTS,
        "Investigation",
        &investigation.contacts,
    ));
    for study in &investigation.studies {
        sections.extend(study_sections(study));
    }

    for section in &sections {
        section.write(&mut csv_writer)?;
    }
    csv_writer.flush()?;
    Ok(())
}
