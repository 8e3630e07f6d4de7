//! The point-in-time snapshot format.
//!
//! A snapshot is the interned ACL table followed by a depth-first walk of the tree as a flat
//! sequence of `(path, node)` records, terminated by the path `"/"`. The parent of every record
//! precedes it in the stream, which is what lets the restore attach nodes as it reads. All
//! primitives are big-endian; strings and byte blobs are length-prefixed with an `i32`, and a
//! negative length stands for an empty blob.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use failure::bail;
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::tree::{DataNode, DataTree};
use crate::types::{Acl, Permission, StatPersisted};

/// Serialization into the snapshot byte format.
pub trait WriteTo {
    /// Write `self` to `writer`.
    fn write_to<W: Write>(&self, writer: W) -> io::Result<()>;
}

impl WriteTo for str {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BigEndian>(self.len() as i32)?;
        writer.write_all(self.as_ref())
    }
}

impl WriteTo for [u8] {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BigEndian>(self.len() as i32)?;
        writer.write_all(self.as_ref())
    }
}

impl WriteTo for Acl {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BigEndian>(self.perms.code())?;
        self.scheme.write_to(&mut writer)?;
        self.id.write_to(writer)
    }
}

impl WriteTo for StatPersisted {
    fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i64::<BigEndian>(self.czxid)?;
        writer.write_i64::<BigEndian>(self.mzxid)?;
        writer.write_i64::<BigEndian>(self.ctime)?;
        writer.write_i64::<BigEndian>(self.mtime)?;
        writer.write_i32::<BigEndian>(self.version)?;
        writer.write_i32::<BigEndian>(self.cversion)?;
        writer.write_i32::<BigEndian>(self.aversion)?;
        writer.write_i64::<BigEndian>(self.ephemeral_owner)?;
        writer.write_i64::<BigEndian>(self.pzxid)
    }
}

/// Deserialization from the snapshot byte format.
pub trait ReadFrom: Sized {
    /// Read a value of this type from `read`.
    fn read_from<R: Read>(read: &mut R) -> io::Result<Self>;
}

impl ReadFrom for StatPersisted {
    fn read_from<R: Read>(read: &mut R) -> io::Result<StatPersisted> {
        Ok(StatPersisted {
            czxid: read.read_i64::<BigEndian>()?,
            mzxid: read.read_i64::<BigEndian>()?,
            ctime: read.read_i64::<BigEndian>()?,
            mtime: read.read_i64::<BigEndian>()?,
            version: read.read_i32::<BigEndian>()?,
            cversion: read.read_i32::<BigEndian>()?,
            aversion: read.read_i32::<BigEndian>()?,
            ephemeral_owner: read.read_i64::<BigEndian>()?,
            pzxid: read.read_i64::<BigEndian>()?,
        })
    }
}

impl ReadFrom for Acl {
    fn read_from<R: Read>(read: &mut R) -> io::Result<Acl> {
        Ok(Acl {
            perms: Permission::from_raw(read.read_u32::<BigEndian>()?),
            scheme: read.read_string()?.into(),
            id: read.read_string()?.into(),
        })
    }
}

pub(crate) trait BufferReader: Read {
    fn read_buffer(&mut self) -> io::Result<Vec<u8>>;
}

impl<R: Read> BufferReader for R {
    fn read_buffer(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_i32::<BigEndian>()?;
        let len = if len < 0 { 0 } else { len as usize };
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

pub(crate) trait StringReader: Read {
    fn read_string(&mut self) -> io::Result<String>;
}

impl<R: Read> StringReader for R {
    fn read_string(&mut self) -> io::Result<String> {
        let raw = self.read_buffer()?;
        String::from_utf8(raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl DataTree {
    /// Stream the tree out: the ACL table, then every znode depth-first from the root, then the
    /// end-of-stream marker.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.acl_cache.serialize(writer)?;
        let mut path = String::new();
        self.serialize_node(writer, &mut path)?;
        // "/" marks end of stream.
        "/".write_to(&mut *writer)
    }

    fn serialize_node<W: Write>(&self, writer: &mut W, path: &mut String) -> io::Result<()> {
        let node = match self.node(path) {
            Some(node) => node,
            None => return Ok(()),
        };
        // Snapshot the node under its lock; the walk itself runs against live mutations.
        let (data, acl, stat, children) = {
            let node = node.lock();
            let children: Vec<String> = node.children().iter().cloned().collect();
            (node.data.clone(), node.acl, node.stat, children)
        };
        path.as_str().write_to(&mut *writer)?;
        data.as_slice().write_to(&mut *writer)?;
        writer.write_i64::<BigEndian>(acl)?;
        stat.write_to(&mut *writer)?;

        path.push('/');
        let off = path.len();
        for child in children {
            // One buffer is reused for the whole walk; drop the previous sibling's name.
            path.truncate(off);
            path.push_str(&child);
            self.serialize_node(writer, path)?;
        }
        Ok(())
    }

    /// Rebuild the tree from a stream written by [`DataTree::serialize`].
    ///
    /// The node index and quota trie are cleared first; the lifecycle indexes are re-derived from
    /// the owner tags as records attach. A record whose parent has not appeared yet, or that
    /// references an ACL handle missing from the table, aborts the restore. Once the marker is
    /// reached, the quota trie and stats nodes are recomputed and unreferenced ACLs are purged.
    pub fn deserialize<R: Read>(&self, reader: &mut R) -> Result<(), failure::Error> {
        self.acl_cache.deserialize(reader)?;
        self.clear_nodes();

        let mut path = reader.read_string()?;
        while path != "/" {
            let data = reader.read_buffer()?;
            let acl = reader.read_i64::<BigEndian>()?;
            let stat = StatPersisted::read_from(reader)?;
            if !self.acl_cache.add_usage(acl) {
                bail!(
                    "invalid snapshot: node {} references unknown ACL handle {}",
                    path,
                    acl
                );
            }
            let node = Arc::new(Mutex::new(DataNode::new(data, acl, stat)));
            self.insert_node(path.clone(), Arc::clone(&node));

            if let Some(last_slash) = path.rfind('/') {
                let parent_path = &path[..last_slash];
                let parent = match self.node(parent_path) {
                    Some(parent) => parent,
                    None => bail!(
                        "invalid snapshot: unable to find parent {} of path {}",
                        parent_path,
                        path
                    ),
                };
                parent.lock().add_child(&path[last_slash + 1..]);
                self.index_by_owner(&path, stat.ephemeral_owner);
            }

            path = reader.read_string()?;
        }
        let root = match self.node("") {
            Some(root) => root,
            None => bail!("invalid snapshot: no root record"),
        };
        self.insert_node("/".to_string(), root);

        self.setup_quota();
        self.acl_cache.purge_unused();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota;
    use crate::types::{EphemeralType, Stat, CONTAINER_EPHEMERAL_OWNER};

    fn populated_tree() -> DataTree {
        let tree = DataTree::new();
        tree.create_node("/app", b"root".to_vec(), Acl::open_unsafe(), 0, -1, 1, 1)
            .unwrap();
        tree.create_node("/app/a", b"aa".to_vec(), Acl::creator_all(), 0, -1, 2, 2)
            .unwrap();
        tree.create_node("/app/a/deep", vec![], Acl::read_unsafe(), 0, -1, 3, 3)
            .unwrap();
        tree.create_node("/eph", vec![], Acl::open_unsafe(), 0x77, -1, 4, 4)
            .unwrap();
        tree.create_node(
            "/cont",
            vec![],
            Acl::open_unsafe(),
            CONTAINER_EPHEMERAL_OWNER,
            -1,
            5,
            5,
        )
        .unwrap();
        tree.create_node(
            "/ttl",
            vec![],
            Acl::open_unsafe(),
            EphemeralType::ttl_to_ephemeral_owner(60_000),
            -1,
            6,
            6,
        )
        .unwrap();
        // A quota subject, mirror nodes included.
        tree.create_node(
            "/zookeeper/quota/app",
            vec![],
            Acl::open_unsafe(),
            0,
            -1,
            7,
            7,
        )
        .unwrap();
        tree.create_node(
            &quota::quota_path("/app"),
            b"count=10,bytes=-1".to_vec(),
            Acl::open_unsafe(),
            0,
            -1,
            8,
            8,
        )
        .unwrap();
        tree.create_node(
            &quota::stat_path("/app"),
            b"count=0,bytes=0".to_vec(),
            Acl::open_unsafe(),
            0,
            -1,
            9,
            9,
        )
        .unwrap();
        tree
    }

    fn stat_of(tree: &DataTree, path: &str) -> Stat {
        tree.stat_node(path, None).unwrap()
    }

    #[test]
    fn round_trip_preserves_nodes_and_indexes() {
        let tree = populated_tree();
        let mut buf = Vec::new();
        tree.serialize(&mut buf).unwrap();

        let restored = DataTree::new();
        restored.deserialize(&mut &buf[..]).unwrap();

        assert_eq!(restored.node_count(), tree.node_count());
        for path in &[
            "/",
            "/app",
            "/app/a",
            "/app/a/deep",
            "/eph",
            "/cont",
            "/ttl",
            "/zookeeper",
            "/zookeeper/quota",
        ] {
            assert_eq!(stat_of(&restored, path), stat_of(&tree, path), "{}", path);
            let (before, _) = tree.get_children(path, None).unwrap();
            let (after, _) = restored.get_children(path, None).unwrap();
            let mut before = before;
            let mut after = after;
            before.sort();
            after.sort();
            assert_eq!(before, after, "{}", path);
        }

        assert_eq!(
            restored.get_data("/app/a", None).unwrap().0,
            tree.get_data("/app/a", None).unwrap().0
        );
        assert_eq!(
            restored.get_acl("/app/a").unwrap().0,
            Acl::creator_all().to_vec()
        );

        assert_eq!(restored.ephemerals(), tree.ephemerals());
        assert_eq!(restored.containers(), tree.containers());
        assert_eq!(restored.ttls(), tree.ttls());
    }

    #[test]
    fn restore_recomputes_quota_state() {
        let tree = populated_tree();
        let mut buf = Vec::new();
        tree.serialize(&mut buf).unwrap();

        let restored = DataTree::new();
        restored.deserialize(&mut &buf[..]).unwrap();

        // setup_quota recounted the /app subtree (3 nodes, 6 bytes of data).
        let (data, _) = restored.get_data(&quota::stat_path("/app"), None).unwrap();
        let track: quota::StatsTrack = String::from_utf8(data).unwrap().parse().unwrap();
        assert_eq!(track.count, 3);
        assert_eq!(track.bytes, 6);

        // The trie is live again: a new create under the subject moves the counter.
        restored
            .create_node("/app/b", b"x".to_vec(), Acl::open_unsafe(), 0, -1, 100, 100)
            .unwrap();
        let (data, _) = restored.get_data(&quota::stat_path("/app"), None).unwrap();
        let track: quota::StatsTrack = String::from_utf8(data).unwrap().parse().unwrap();
        assert_eq!(track.count, 4);
        assert_eq!(track.bytes, 7);
    }

    #[test]
    fn restore_rejects_orphan_records() {
        let tree = DataTree::new();
        let mut buf = Vec::new();
        tree.acl_cache.serialize(&mut buf).unwrap();
        // A record whose parent never appeared in the stream.
        "/ghost/child".write_to(&mut buf).unwrap();
        (&b""[..]).write_to(&mut buf).unwrap();
        buf.extend_from_slice(&(-1i64).to_be_bytes());
        StatPersisted::default().write_to(&mut buf).unwrap();
        "/".write_to(&mut buf).unwrap();

        let restored = DataTree::new();
        let err = restored.deserialize(&mut &buf[..]).unwrap_err();
        assert!(err.to_string().contains("unable to find parent"));
    }

    #[test]
    fn restore_rejects_unknown_acl_handles() {
        let tree = DataTree::new();
        tree.create_node("/a", vec![], Acl::open_unsafe(), 0, -1, 1, 1)
            .unwrap();
        let mut buf = Vec::new();
        tree.serialize(&mut buf).unwrap();

        let table_len = {
            let mut table = Vec::new();
            tree.acl_cache.serialize(&mut table).unwrap();
            table.len()
        };
        // Splice an empty ACL table in front of the same node records.
        let mut corrupt = vec![0u8, 0, 0, 0];
        corrupt.extend_from_slice(&buf[table_len..]);

        let restored = DataTree::new();
        let err = restored.deserialize(&mut &corrupt[..]).unwrap_err();
        assert!(err.to_string().contains("unknown ACL handle"));
    }

    #[test]
    fn stat_round_trips_through_the_codec() {
        let stat = StatPersisted {
            czxid: 1,
            mzxid: 2,
            ctime: 3,
            mtime: 4,
            version: 5,
            cversion: 6,
            aversion: 7,
            ephemeral_owner: -8,
            pzxid: 9,
        };
        let mut buf = Vec::new();
        stat.write_to(&mut buf).unwrap();
        assert_eq!(StatPersisted::read_from(&mut &buf[..]).unwrap(), stat);
    }

    #[test]
    fn acl_entries_round_trip_through_the_codec() {
        for acl in Acl::creator_all().iter().chain(Acl::read_unsafe()) {
            let mut buf = Vec::new();
            acl.write_to(&mut buf).unwrap();
            assert_eq!(&Acl::read_from(&mut &buf[..]).unwrap(), acl);
        }
    }
}
