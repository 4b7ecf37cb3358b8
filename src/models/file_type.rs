use serde::{Deserialize, Serialize};

/// Document classes understood by the legacy binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    TextPlain,
    Html,
    MsExcel,
    MsPowerPoint,
    MsWord,
    Pdf,
    Xml,
}

impl DocumentType {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentType::TextPlain => "txt",
            DocumentType::Html => "html",
            DocumentType::MsExcel => "xls",
            DocumentType::MsPowerPoint => "ppt",
            DocumentType::MsWord => "doc",
            DocumentType::Pdf => "pdf",
            DocumentType::Xml => "xml",
        }
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_ext(self.extension())
            .first_or_text_plain()
            .essence_str()
            .to_string()
    }
}

/// MIME classification of a file, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    TextPlain,
    Html,
    Xml,
    Json,
    Pdf,
    MsWord,
    MsExcel,
    MsPowerPoint,
    Undefined,
}

impl Default for FileType {
    fn default() -> Self {
        FileType::TextPlain
    }
}

impl FileType {
    /// Classifies `name` by its extension; names without one are plain text
    pub fn from_name(name: &str) -> Self {
        let extension = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => return FileType::TextPlain,
        };

        match extension.as_str() {
            "txt" => FileType::TextPlain,
            "html" | "htm" => FileType::Html,
            "xml" => FileType::Xml,
            "json" => FileType::Json,
            "pdf" => FileType::Pdf,
            "doc" | "docx" => FileType::MsWord,
            "xls" | "xlsx" => FileType::MsExcel,
            "ppt" | "pptx" => FileType::MsPowerPoint,
            _ => FileType::Undefined,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileType::TextPlain | FileType::Undefined => "txt",
            FileType::Html => "html",
            FileType::Xml => "xml",
            FileType::Json => "json",
            FileType::Pdf => "pdf",
            FileType::MsWord => "doc",
            FileType::MsExcel => "xls",
            FileType::MsPowerPoint => "ppt",
        }
    }

    pub fn mime_type(&self) -> String {
        match self {
            FileType::Undefined => "application/octet-stream".to_string(),
            other => mime_guess::from_ext(other.extension())
                .first_or_text_plain()
                .essence_str()
                .to_string(),
        }
    }

    /// Legacy document class used when creating this file through the binding
    pub fn document_type(&self) -> DocumentType {
        match self {
            FileType::Html => DocumentType::Html,
            FileType::Xml => DocumentType::Xml,
            FileType::Pdf => DocumentType::Pdf,
            FileType::MsWord => DocumentType::MsWord,
            FileType::MsExcel => DocumentType::MsExcel,
            FileType::MsPowerPoint => DocumentType::MsPowerPoint,
            FileType::TextPlain | FileType::Json | FileType::Undefined => DocumentType::TextPlain,
        }
    }
}

impl From<DocumentType> for FileType {
    fn from(document_type: DocumentType) -> Self {
        FileType::from_name(&format!("x.{}", document_type.extension()))
    }
}
