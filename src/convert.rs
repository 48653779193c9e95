//! Batch conversion of XML annotation records into label files
//!
//! Every `*.xml` in the input directory becomes `<stem>.txt` in the output
//! directory. Records that fail to parse, or whose mapped objects lack a
//! complete box, are reported and skipped; objects whose class is not in the
//! map are dropped one by one.

use std::path::Path;
use std::time::Instant;

#[allow(unused_imports)]
use log::{debug, info, warn, error};

use crate::codec::{to_normalized, NormalizedLabel};
use crate::config::ClassMap;
use crate::error::Result;
use crate::file_io;
use crate::label_writer;
use crate::voc::SourceRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Label files written
    pub converted: usize,
    /// Records that could not be read or parsed
    pub failed_records: usize,
    /// Objects dropped because their class is not mapped
    pub skipped_objects: usize,
}

/// Labels for one record plus the number of unmapped objects it had
pub fn convert_record(record: &SourceRecord, classes: &ClassMap) -> Result<(Vec<NormalizedLabel>, usize)> {
    let mapped = record.map_classes(classes)?;
    let labels = mapped
        .boxes
        .iter()
        .map(|(class_id, rect)| to_normalized(rect, *class_id, record.image_size))
        .collect();
    Ok((labels, mapped.skipped))
}

fn convert_file(xml_path: &Path, output_dir: &Path, classes: &ClassMap) -> Result<(usize, usize)> {
    let record = SourceRecord::from_file(xml_path)?;
    let (labels, skipped) = convert_record(&record, classes)?;
    debug!("{:?}", labels.iter().map(label_writer::format_label).collect::<Vec<_>>());

    let label_path = file_io::label_path_for(output_dir, xml_path);
    label_writer::write_label_file(&label_path, &labels)?;
    info!("Processed: {} -> {}", xml_path.display(), label_path.display());
    Ok((labels.len(), skipped))
}

/// Converts every record in `input_dir`. Only a missing or unreadable input
/// directory (or an output directory that can't be created) fails the batch.
pub fn process_all_files(input_dir: &Path, output_dir: &Path, classes: &ClassMap) -> Result<ConversionReport> {
    let start = Instant::now();
    std::fs::create_dir_all(output_dir)?;

    let xml_files = file_io::get_xml_paths(input_dir)?;
    info!(
        "Converting {} record(s) from {} with {} mapped class(es)",
        xml_files.len(),
        input_dir.display(),
        classes.len()
    );

    let mut report = ConversionReport::default();
    for xml_path in &xml_files {
        match convert_file(xml_path, output_dir, classes) {
            Ok((_, skipped)) => {
                report.converted += 1;
                report.skipped_objects += skipped;
            }
            Err(e) => {
                error!("Skipping {}: {}", xml_path.display(), e);
                report.failed_records += 1;
            }
        }
    }

    info!(
        "Conversion completed in {:?}: {} converted, {} failed, {} object(s) skipped",
        start.elapsed(),
        report.converted,
        report.failed_records,
        report.skipped_objects
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record_xml(width: u32, height: u32, objects: &[(&str, [f64; 4])]) -> String {
        let mut xml = format!(
            "<annotation><size><width>{}</width><height>{}</height><depth>3</depth></size>",
            width, height
        );
        for (name, [xmin, ymin, xmax, ymax]) in objects {
            xml.push_str(&format!(
                "<object><name>{}</name><bndbox><xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax></bndbox></object>",
                name, xmin, ymin, xmax, ymax
            ));
        }
        xml.push_str("</annotation>");
        xml
    }

    #[test]
    fn test_reference_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("xml");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("frame.xml"), record_xml(640, 480, &[("l", [10.0, 10.0, 110.0, 210.0])])).unwrap();

        let output = dir.path().join("labels");
        let report = process_all_files(&input, &output, &ClassMap::from([("l", 0)])).unwrap();
        assert_eq!(report, ConversionReport { converted: 1, failed_records: 0, skipped_objects: 0 });
        assert_eq!(
            fs::read_to_string(output.join("frame.txt")).unwrap(),
            "0 0.093750 0.229167 0.156250 0.416667\n"
        );
    }

    #[test]
    fn test_class_ids_come_from_the_map() {
        let record = SourceRecord::from_str(&record_xml(
            100,
            100,
            &[("car", [0.0, 0.0, 10.0, 10.0]), ("person", [0.0, 0.0, 50.0, 50.0]), ("tree", [1.0, 1.0, 2.0, 2.0])],
        ))
        .unwrap();
        let (labels, skipped) = convert_record(&record, &ClassMap::from([("car", 1), ("person", 2)])).unwrap();
        assert_eq!(labels.iter().map(|l| l.class_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_bad_records_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path();
        fs::write(input.join("a.xml"), record_xml(10, 10, &[("l", [1.0, 1.0, 5.0, 5.0]), ("dog", [1.0, 1.0, 2.0, 2.0])])).unwrap();
        fs::write(input.join("b.xml"), "<annotation><object><name>l</name></object></annotation>").unwrap();
        fs::write(input.join("c.xml"), "<annotation><size>").unwrap();
        fs::write(input.join("d.xml"), record_xml(10, 10, &[])).unwrap();
        fs::write(input.join("e.txt"), "ignored").unwrap();

        let output = input.join("out");
        let report = process_all_files(input, &output, &ClassMap::from([("l", 0)])).unwrap();
        assert_eq!(report, ConversionReport { converted: 2, failed_records: 2, skipped_objects: 1 });

        assert_eq!(fs::read_to_string(output.join("a.txt")).unwrap().lines().count(), 1);
        assert!(!output.join("b.txt").exists());
        assert!(!output.join("c.txt").exists());
        assert_eq!(fs::read(output.join("d.txt")).unwrap().len(), 0);
    }

    #[test]
    fn test_unmapped_object_without_box_keeps_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path();
        fs::write(
            input.join("a.xml"),
            "<annotation><size><width>640</width><height>480</height></size>\
             <object><name>l</name><bndbox><xmin>10</xmin><ymin>10</ymin><xmax>110</xmax><ymax>210</ymax></bndbox></object>\
             <segmented>0</segmented>\
             <object><name>dog</name></object>\
             </annotation>",
        )
        .unwrap();
        fs::write(
            input.join("b.xml"),
            "<annotation><size><width>640</width><height>480</height></size>\
             <object><name>l</name><bndbox><xmin>10</xmin></bndbox></object>\
             </annotation>",
        )
        .unwrap();

        let output = input.join("out");
        let report = process_all_files(input, &output, &ClassMap::from([("l", 0)])).unwrap();
        assert_eq!(report, ConversionReport { converted: 1, failed_records: 1, skipped_objects: 1 });
        assert_eq!(
            fs::read_to_string(output.join("a.txt")).unwrap(),
            "0 0.093750 0.229167 0.156250 0.416667\n"
        );
        assert!(!output.join("b.txt").exists());
    }

    #[test]
    fn test_missing_input_directory_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_all_files(&dir.path().join("absent"), &dir.path().join("out"), &ClassMap::from([("l", 0)]));
        assert!(result.is_err());
    }
}
