// Test fixtures: in-memory CVM archive and ficha template

use crate::registry::{Registry, CLASSE_MEMBER, FUNDO_MEMBER, SUBCLASSE_MEMBER};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const FUNDO_CSV: &str = "\
CNPJ_Fundo;Codigo_CVM;Data_Registro;Data_Constituicao;Tipo_Fundo;Denominacao_Social;CNPJ_Administrador;Administrador;Tipo_Pessoa_Gestor;CPF_CNPJ_Gestor;Gestor
12.345.678/0001-90;100;2020-01-10;2020-01-15;FIF;Fundo Teste;11.222.333/0001-44;Admin DTVM;PJ;55.666.777/0001-88;Gestora XYZ
98765432000110;200;2018-06-20;2018-07-01;FIF;Fundo Ações Brasil;1222333000144;Banco Admin;PF;12345678901;Maria Gestora
12345678000190;100;2021-01-01;2021-01-01;FIF;Fundo Duplicado;;;;;
11111111000191;300;2015-05-05;sem data;FIF;Fundo Sem Data;;;PF;123;Gestor Curto
";

pub const CLASSE_CSV: &str = "\
ID_Registro_Classe;CNPJ_Classe;Codigo_CVM;Denominacao_Social
1;12345678000190;100;Classe Teste
2;12345678000190;100;Classe Repetida
";

pub const SUBCLASSE_CSV: &str = "\
ID_Subclasse;Codigo_CVM;Denominacao_Social;Exclusivo
1;100;Subclasse Teste;N
";

/// Encode test text the way CVM publishes it (latin-1)
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

pub fn registry_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

pub fn sample_archive() -> Vec<u8> {
    let fundo = latin1(FUNDO_CSV);
    let classe = latin1(CLASSE_CSV);
    let subclasse = latin1(SUBCLASSE_CSV);

    registry_archive(&[
        (FUNDO_MEMBER, fundo.as_slice()),
        (CLASSE_MEMBER, classe.as_slice()),
        (SUBCLASSE_MEMBER, subclasse.as_slice()),
    ])
}

pub fn sample_registry() -> Registry {
    Registry::from_archive(&sample_archive()).unwrap()
}

pub const TEMPLATE_BODY: &str = concat!(
    r#"<w:p><w:r><w:t>Fundo: {{Denominacao_Social}}</w:t></w:r></w:p>"#,
    r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t xml:space="preserve">CNPJ {{CNPJ_Fundo}} </w:t></w:r></w:p></w:tc>"#,
    r#"<w:tc><w:p><w:r><w:t>{{Exclusivo}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
    r#"<w:p><w:r><w:t>{{Codigo_</w:t></w:r><w:r><w:t>CVM}}</w:t></w:r></w:p>"#,
);

/// Minimal .docx: content types, one styles part, and the document body
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r#"<w:body>{}</w:body></w:document>"#
        ),
        body
    );

    let content_types = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#
    );

    registry_archive(&[
        ("[Content_Types].xml", content_types.as_bytes()),
        ("word/styles.xml", b"<w:styles/>".as_slice()),
        ("word/document.xml", document.as_bytes()),
    ])
}

pub fn docx_template() -> Vec<u8> {
    docx_with_body(TEMPLATE_BODY)
}

pub fn entry_names(zip_bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Entry names as stored, first to last
pub fn entry_names_in_order(zip_bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

pub fn read_entry(zip_bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

/// word/document.xml of the ficha stored at `entry` inside a rendered set
pub fn ficha_document_xml(set_bytes: &[u8], entry: &str) -> String {
    let docx = read_entry(set_bytes, entry);
    String::from_utf8(read_entry(&docx, "word/document.xml")).unwrap()
}
