//! The curated attribute table.
//!
//! The table covers the command set, file meta group and every
//! composite attribute the PACS touches: identification, patient,
//! acquisition, relationship, presentation, worklist, MPPS and
//! pixel data attributes, plus the attributes targeted by the
//! de-identification profiles.

use pacs_core::dictionary::DictionaryEntry;
use pacs_core::{Tag, VR};

macro_rules! dictionary {
    ($( ($g:literal, $e:literal) $name:ident => $alias:literal, $vr:ident; )*) => {
        /// Tag constants, named after the PS3.6 keyword of each attribute.
        pub mod tags {
            use pacs_core::Tag;
            $(
                pub const $name: Tag = Tag($g, $e);
            )*
        }

        /// All entries of the dictionary, in declaration order.
        pub static ENTRIES: &[DictionaryEntry] = &[
            $(
                DictionaryEntry {
                    tag: Tag($g, $e),
                    alias: $alias,
                    vr: VR::$vr,
                },
            )*
        ];
    };
}

dictionary! {
    // command set (PS3.7)
    (0x0000, 0x0000) COMMAND_GROUP_LENGTH => "CommandGroupLength", UL;
    (0x0000, 0x0002) AFFECTED_SOP_CLASS_UID => "AffectedSOPClassUID", UI;
    (0x0000, 0x0003) REQUESTED_SOP_CLASS_UID => "RequestedSOPClassUID", UI;
    (0x0000, 0x0100) COMMAND_FIELD => "CommandField", US;
    (0x0000, 0x0110) MESSAGE_ID => "MessageID", US;
    (0x0000, 0x0120) MESSAGE_ID_BEING_RESPONDED_TO => "MessageIDBeingRespondedTo", US;
    (0x0000, 0x0600) MOVE_DESTINATION => "MoveDestination", AE;
    (0x0000, 0x0700) PRIORITY => "Priority", US;
    (0x0000, 0x0800) COMMAND_DATA_SET_TYPE => "CommandDataSetType", US;
    (0x0000, 0x0900) STATUS => "Status", US;
    (0x0000, 0x0901) OFFENDING_ELEMENT => "OffendingElement", AT;
    (0x0000, 0x0902) ERROR_COMMENT => "ErrorComment", LO;
    (0x0000, 0x1000) AFFECTED_SOP_INSTANCE_UID => "AffectedSOPInstanceUID", UI;
    (0x0000, 0x1001) REQUESTED_SOP_INSTANCE_UID => "RequestedSOPInstanceUID", UI;
    (0x0000, 0x1002) EVENT_TYPE_ID => "EventTypeID", US;
    (0x0000, 0x1008) ACTION_TYPE_ID => "ActionTypeID", US;
    (0x0000, 0x1020) NUMBER_OF_REMAINING_SUBOPERATIONS => "NumberOfRemainingSuboperations", US;
    (0x0000, 0x1021) NUMBER_OF_COMPLETED_SUBOPERATIONS => "NumberOfCompletedSuboperations", US;
    (0x0000, 0x1022) NUMBER_OF_FAILED_SUBOPERATIONS => "NumberOfFailedSuboperations", US;
    (0x0000, 0x1023) NUMBER_OF_WARNING_SUBOPERATIONS => "NumberOfWarningSuboperations", US;
    (0x0000, 0x1030) MOVE_ORIGINATOR_APPLICATION_ENTITY_TITLE => "MoveOriginatorApplicationEntityTitle", AE;
    (0x0000, 0x1031) MOVE_ORIGINATOR_MESSAGE_ID => "MoveOriginatorMessageID", US;

    // file meta information (PS3.10)
    (0x0002, 0x0000) FILE_META_INFORMATION_GROUP_LENGTH => "FileMetaInformationGroupLength", UL;
    (0x0002, 0x0001) FILE_META_INFORMATION_VERSION => "FileMetaInformationVersion", OB;
    (0x0002, 0x0002) MEDIA_STORAGE_SOP_CLASS_UID => "MediaStorageSOPClassUID", UI;
    (0x0002, 0x0003) MEDIA_STORAGE_SOP_INSTANCE_UID => "MediaStorageSOPInstanceUID", UI;
    (0x0002, 0x0010) TRANSFER_SYNTAX_UID => "TransferSyntaxUID", UI;
    (0x0002, 0x0012) IMPLEMENTATION_CLASS_UID => "ImplementationClassUID", UI;
    (0x0002, 0x0013) IMPLEMENTATION_VERSION_NAME => "ImplementationVersionName", SH;
    (0x0002, 0x0016) SOURCE_APPLICATION_ENTITY_TITLE => "SourceApplicationEntityTitle", AE;

    // identification
    (0x0008, 0x0005) SPECIFIC_CHARACTER_SET => "SpecificCharacterSet", CS;
    (0x0008, 0x0008) IMAGE_TYPE => "ImageType", CS;
    (0x0008, 0x0016) SOP_CLASS_UID => "SOPClassUID", UI;
    (0x0008, 0x0018) SOP_INSTANCE_UID => "SOPInstanceUID", UI;
    (0x0008, 0x0020) STUDY_DATE => "StudyDate", DA;
    (0x0008, 0x0021) SERIES_DATE => "SeriesDate", DA;
    (0x0008, 0x0022) ACQUISITION_DATE => "AcquisitionDate", DA;
    (0x0008, 0x0023) CONTENT_DATE => "ContentDate", DA;
    (0x0008, 0x0030) STUDY_TIME => "StudyTime", TM;
    (0x0008, 0x0031) SERIES_TIME => "SeriesTime", TM;
    (0x0008, 0x0032) ACQUISITION_TIME => "AcquisitionTime", TM;
    (0x0008, 0x0033) CONTENT_TIME => "ContentTime", TM;
    (0x0008, 0x0050) ACCESSION_NUMBER => "AccessionNumber", SH;
    (0x0008, 0x0052) QUERY_RETRIEVE_LEVEL => "QueryRetrieveLevel", CS;
    (0x0008, 0x0054) RETRIEVE_AE_TITLE => "RetrieveAETitle", AE;
    (0x0008, 0x0060) MODALITY => "Modality", CS;
    (0x0008, 0x0064) CONVERSION_TYPE => "ConversionType", CS;
    (0x0008, 0x0070) MANUFACTURER => "Manufacturer", LO;
    (0x0008, 0x0080) INSTITUTION_NAME => "InstitutionName", LO;
    (0x0008, 0x0081) INSTITUTION_ADDRESS => "InstitutionAddress", ST;
    (0x0008, 0x0090) REFERRING_PHYSICIAN_NAME => "ReferringPhysicianName", PN;
    (0x0008, 0x0094) REFERRING_PHYSICIAN_TELEPHONE_NUMBERS => "ReferringPhysicianTelephoneNumbers", SH;
    (0x0008, 0x1010) STATION_NAME => "StationName", SH;
    (0x0008, 0x1030) STUDY_DESCRIPTION => "StudyDescription", LO;
    (0x0008, 0x103E) SERIES_DESCRIPTION => "SeriesDescription", LO;
    (0x0008, 0x1040) INSTITUTIONAL_DEPARTMENT_NAME => "InstitutionalDepartmentName", LO;
    (0x0008, 0x1048) PHYSICIANS_OF_RECORD => "PhysiciansOfRecord", PN;
    (0x0008, 0x1050) PERFORMING_PHYSICIAN_NAME => "PerformingPhysicianName", PN;
    (0x0008, 0x1060) NAME_OF_PHYSICIANS_READING_STUDY => "NameOfPhysiciansReadingStudy", PN;
    (0x0008, 0x1070) OPERATORS_NAME => "OperatorsName", PN;
    (0x0008, 0x1090) MANUFACTURER_MODEL_NAME => "ManufacturerModelName", LO;
    (0x0008, 0x1140) REFERENCED_IMAGE_SEQUENCE => "ReferencedImageSequence", SQ;
    (0x0008, 0x2111) DERIVATION_DESCRIPTION => "DerivationDescription", ST;

    // patient
    (0x0010, 0x0010) PATIENT_NAME => "PatientName", PN;
    (0x0010, 0x0020) PATIENT_ID => "PatientID", LO;
    (0x0010, 0x0021) ISSUER_OF_PATIENT_ID => "IssuerOfPatientID", LO;
    (0x0010, 0x0030) PATIENT_BIRTH_DATE => "PatientBirthDate", DA;
    (0x0010, 0x0032) PATIENT_BIRTH_TIME => "PatientBirthTime", TM;
    (0x0010, 0x0040) PATIENT_SEX => "PatientSex", CS;
    (0x0010, 0x1000) OTHER_PATIENT_IDS => "OtherPatientIDs", LO;
    (0x0010, 0x1001) OTHER_PATIENT_NAMES => "OtherPatientNames", PN;
    (0x0010, 0x1010) PATIENT_AGE => "PatientAge", AS;
    (0x0010, 0x1020) PATIENT_SIZE => "PatientSize", DS;
    (0x0010, 0x1030) PATIENT_WEIGHT => "PatientWeight", DS;
    (0x0010, 0x1040) PATIENT_ADDRESS => "PatientAddress", LO;
    (0x0010, 0x1060) PATIENT_MOTHER_BIRTH_NAME => "PatientMotherBirthName", PN;
    (0x0010, 0x1090) MEDICAL_RECORD_LOCATOR => "MedicalRecordLocator", LO;
    (0x0010, 0x2154) PATIENT_TELEPHONE_NUMBERS => "PatientTelephoneNumbers", SH;
    (0x0010, 0x2160) ETHNIC_GROUP => "EthnicGroup", SH;
    (0x0010, 0x21B0) ADDITIONAL_PATIENT_HISTORY => "AdditionalPatientHistory", LT;
    (0x0010, 0x4000) PATIENT_COMMENTS => "PatientComments", LT;

    // acquisition
    (0x0018, 0x0015) BODY_PART_EXAMINED => "BodyPartExamined", CS;
    (0x0018, 0x0020) SCANNING_SEQUENCE => "ScanningSequence", CS;
    (0x0018, 0x0021) SEQUENCE_VARIANT => "SequenceVariant", CS;
    (0x0018, 0x0050) SLICE_THICKNESS => "SliceThickness", DS;
    (0x0018, 0x0060) KVP => "KVP", DS;
    (0x0018, 0x0080) REPETITION_TIME => "RepetitionTime", DS;
    (0x0018, 0x0081) ECHO_TIME => "EchoTime", DS;
    (0x0018, 0x0088) SPACING_BETWEEN_SLICES => "SpacingBetweenSlices", DS;
    (0x0018, 0x1000) DEVICE_SERIAL_NUMBER => "DeviceSerialNumber", LO;
    (0x0018, 0x1020) SOFTWARE_VERSIONS => "SoftwareVersions", LO;
    (0x0018, 0x1030) PROTOCOL_NAME => "ProtocolName", LO;
    (0x0018, 0x1151) XRAY_TUBE_CURRENT => "XRayTubeCurrent", IS;
    (0x0018, 0x5100) PATIENT_POSITION => "PatientPosition", CS;

    // relationship
    (0x0020, 0x000D) STUDY_INSTANCE_UID => "StudyInstanceUID", UI;
    (0x0020, 0x000E) SERIES_INSTANCE_UID => "SeriesInstanceUID", UI;
    (0x0020, 0x0010) STUDY_ID => "StudyID", SH;
    (0x0020, 0x0011) SERIES_NUMBER => "SeriesNumber", IS;
    (0x0020, 0x0013) INSTANCE_NUMBER => "InstanceNumber", IS;
    (0x0020, 0x0020) PATIENT_ORIENTATION => "PatientOrientation", CS;
    (0x0020, 0x0032) IMAGE_POSITION_PATIENT => "ImagePositionPatient", DS;
    (0x0020, 0x0037) IMAGE_ORIENTATION_PATIENT => "ImageOrientationPatient", DS;
    (0x0020, 0x0052) FRAME_OF_REFERENCE_UID => "FrameOfReferenceUID", UI;
    (0x0020, 0x1041) SLICE_LOCATION => "SliceLocation", DS;
    (0x0020, 0x4000) IMAGE_COMMENTS => "ImageComments", LT;

    // image presentation
    (0x0028, 0x0002) SAMPLES_PER_PIXEL => "SamplesPerPixel", US;
    (0x0028, 0x0004) PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation", CS;
    (0x0028, 0x0006) PLANAR_CONFIGURATION => "PlanarConfiguration", US;
    (0x0028, 0x0008) NUMBER_OF_FRAMES => "NumberOfFrames", IS;
    (0x0028, 0x0010) ROWS => "Rows", US;
    (0x0028, 0x0011) COLUMNS => "Columns", US;
    (0x0028, 0x0030) PIXEL_SPACING => "PixelSpacing", DS;
    (0x0028, 0x0100) BITS_ALLOCATED => "BitsAllocated", US;
    (0x0028, 0x0101) BITS_STORED => "BitsStored", US;
    (0x0028, 0x0102) HIGH_BIT => "HighBit", US;
    (0x0028, 0x0103) PIXEL_REPRESENTATION => "PixelRepresentation", US;
    (0x0028, 0x1050) WINDOW_CENTER => "WindowCenter", DS;
    (0x0028, 0x1051) WINDOW_WIDTH => "WindowWidth", DS;
    (0x0028, 0x1052) RESCALE_INTERCEPT => "RescaleIntercept", DS;
    (0x0028, 0x1053) RESCALE_SLOPE => "RescaleSlope", DS;
    (0x0028, 0x1055) WINDOW_CENTER_WIDTH_EXPLANATION => "WindowCenterWidthExplanation", LO;

    // visit and admission
    (0x0038, 0x0010) ADMISSION_ID => "AdmissionID", LO;
    (0x0038, 0x0300) CURRENT_PATIENT_LOCATION => "CurrentPatientLocation", LO;

    // worklist and procedure step
    (0x0032, 0x1032) REQUESTING_PHYSICIAN => "RequestingPhysician", PN;
    (0x0032, 0x1060) REQUESTED_PROCEDURE_DESCRIPTION => "RequestedProcedureDescription", LO;
    (0x0040, 0x0001) SCHEDULED_STATION_AE_TITLE => "ScheduledStationAETitle", AE;
    (0x0040, 0x0002) SCHEDULED_PROCEDURE_STEP_START_DATE => "ScheduledProcedureStepStartDate", DA;
    (0x0040, 0x0003) SCHEDULED_PROCEDURE_STEP_START_TIME => "ScheduledProcedureStepStartTime", TM;
    (0x0040, 0x0006) SCHEDULED_PERFORMING_PHYSICIAN_NAME => "ScheduledPerformingPhysicianName", PN;
    (0x0040, 0x0007) SCHEDULED_PROCEDURE_STEP_DESCRIPTION => "ScheduledProcedureStepDescription", LO;
    (0x0040, 0x0009) SCHEDULED_PROCEDURE_STEP_ID => "ScheduledProcedureStepID", SH;
    (0x0040, 0x0100) SCHEDULED_PROCEDURE_STEP_SEQUENCE => "ScheduledProcedureStepSequence", SQ;
    (0x0040, 0x0244) PERFORMED_PROCEDURE_STEP_START_DATE => "PerformedProcedureStepStartDate", DA;
    (0x0040, 0x0245) PERFORMED_PROCEDURE_STEP_START_TIME => "PerformedProcedureStepStartTime", TM;
    (0x0040, 0x0250) PERFORMED_PROCEDURE_STEP_END_DATE => "PerformedProcedureStepEndDate", DA;
    (0x0040, 0x0251) PERFORMED_PROCEDURE_STEP_END_TIME => "PerformedProcedureStepEndTime", TM;
    (0x0040, 0x0252) PERFORMED_PROCEDURE_STEP_STATUS => "PerformedProcedureStepStatus", CS;
    (0x0040, 0x0253) PERFORMED_PROCEDURE_STEP_ID => "PerformedProcedureStepID", SH;
    (0x0040, 0x1001) REQUESTED_PROCEDURE_ID => "RequestedProcedureID", SH;
    (0x0040, 0x2016) PLACER_ORDER_NUMBER_IMAGING_SERVICE_REQUEST => "PlacerOrderNumberImagingServiceRequest", LO;
    (0x0040, 0x2017) FILLER_ORDER_NUMBER_IMAGING_SERVICE_REQUEST => "FillerOrderNumberImagingServiceRequest", LO;

    // pixel data
    (0x7FE0, 0x0010) PIXEL_DATA => "PixelData", OW;
}
