use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Checks whether the last byte of a file is a new line. Empty files count as terminated. The
/// cursor is left at the end of the file.
///
/// Useful before appending a line, since a torn write might have left the last line unfinished.
pub async fn ends_with_newline(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
) -> Result<bool, io::Error> {
    let length = file.seek(std::io::SeekFrom::End(0)).await?;
    if length == 0 {
        return Ok(true);
    }
    file.seek(std::io::SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;

    use tempfile::tempfile;
    use tokio::io::AsyncSeekExt;

    use crate::fs::operations::ends_with_newline;

    #[tokio::test]
    async fn test_ends_with_newline_terminated() -> Result<()> {
        let mut file = tempfile()?;
        file.write_all(b"first line\nsecond line\n")?;

        let mut file = tokio::fs::File::from_std(file);

        assert!(ends_with_newline(&mut file).await?);
        assert_eq!(file.stream_position().await?, 23);
        Ok(())
    }

    #[tokio::test]
    async fn test_ends_with_newline_torn() -> Result<()> {
        let mut file = tempfile()?;
        file.write_all(b"first line\nsecond li")?;

        let mut file = tokio::fs::File::from_std(file);

        assert!(!ends_with_newline(&mut file).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_ends_with_newline_empty() -> Result<()> {
        let file = tempfile()?;
        let mut file = tokio::fs::File::from_std(file);

        assert!(ends_with_newline(&mut file).await?);
        assert_eq!(file.stream_position().await?, 0);
        Ok(())
    }
}
